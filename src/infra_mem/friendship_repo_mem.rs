use crate::domain_model::*;
use crate::domain_port::{FriendshipRepo, StoreError, Subscription};
use crate::infra_mem::MemStore;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

pub struct MemFriendshipRepo {
    store: Arc<MemStore>,
}

impl MemFriendshipRepo {
    pub fn new(store: Arc<MemStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl FriendshipRepo for MemFriendshipRepo {
    async fn get(&self, id: &FriendshipId) -> Result<Option<Friendship>, StoreError> {
        Ok(self.store.friendships.get(id).map(|e| e.value().clone()))
    }

    async fn put(&self, friendship: &Friendship) -> Result<(), StoreError> {
        self.store
            .friendships
            .insert(friendship.id.clone(), friendship.clone());
        self.store.notify_friendships();
        Ok(())
    }

    async fn delete(&self, id: &FriendshipId) -> Result<(), StoreError> {
        if self.store.friendships.remove(id).is_some() {
            self.store.notify_friendships();
        }
        Ok(())
    }

    async fn list_for_user(
        &self,
        user: UserId,
        status: FriendshipStatus,
    ) -> Result<Vec<Friendship>, StoreError> {
        Ok(self.store.friendships_for(user, status))
    }

    async fn subscribe_for_user(
        &self,
        user: UserId,
        status: FriendshipStatus,
        snapshots: Sender<Vec<Friendship>>,
    ) -> Result<Subscription, StoreError> {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let store = self.store.clone();
        let mut feed = self.store.friendship_feed.subscribe();

        let task = tokio::spawn(async move {
            // Initial snapshot is pushed before any change tick.
            if snapshots.send(store.friendships_for(user, status)).await.is_err() {
                return;
            }
            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    tick = feed.recv() => {
                        if matches!(tick, Err(broadcast::error::RecvError::Closed)) {
                            break;
                        }
                        // A lagged receiver still recomputes from live state.
                        if snapshots.send(store.friendships_for(user, status)).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Ok(Subscription::new(token, task))
    }
}
