use std::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle for a live store subscription. Cancelling is idempotent; after
/// `cancel` returns no further snapshot is delivered to the subscriber,
/// so a signed-out identity can never receive a stale update.
pub struct Subscription {
    token: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Subscription {
    pub fn new(token: CancellationToken, task: JoinHandle<()>) -> Self {
        Self {
            token,
            tasks: Mutex::new(vec![task]),
        }
    }

    /// Token shared by every task serving this subscription. Attached
    /// pipeline stages select on it so they stop in the same instant.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Registers an additional task (e.g. a read-model mapping stage) to be
    /// joined on shutdown.
    pub fn attach(&self, task: JoinHandle<()>) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(task);
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancels and waits for all serving tasks to finish.
    pub async fn shutdown(&self) {
        self.token.cancel();
        let tasks = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(_) => Vec::new(),
        };
        for task in tasks {
            let _ = task.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
