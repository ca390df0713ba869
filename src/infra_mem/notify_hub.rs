use crate::domain_model::{Notification, UserId};
use crate::domain_port::NotificationDispatch;
use dashmap::DashMap;
use tokio::sync::mpsc;

/// In-process notification fan-out. Each registered user gets an unbounded
/// channel; notifications for unregistered users are dropped, mirroring a
/// push service with no subscribed device.
pub struct NotifyHub {
    channels: DashMap<UserId, mpsc::UnboundedSender<Notification>>,
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Registers `user`'s device; replaces any previous registration.
    pub fn register(&self, user: UserId) -> mpsc::UnboundedReceiver<Notification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.insert(user, tx);
        rx
    }

    pub fn unregister(&self, user: UserId) {
        self.channels.remove(&user);
    }
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NotificationDispatch for NotifyHub {
    async fn notify(&self, target: UserId, notification: Notification) -> anyhow::Result<()> {
        if let Some(tx) = self.channels.get(&target) {
            // A closed receiver means the device went away mid-send.
            let _ = tx.send(notification);
        }
        Ok(())
    }
}
