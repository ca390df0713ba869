use crate::domain_model::*;
use crate::domain_port::{StoreError, Subscription};
use tokio::sync::mpsc::Sender;

#[async_trait::async_trait]
pub trait FriendshipRepo: Send + Sync {
    async fn get(&self, id: &FriendshipId) -> Result<Option<Friendship>, StoreError>;

    /// Writes the full document (create or overwrite).
    async fn put(&self, friendship: &Friendship) -> Result<(), StoreError>;

    async fn delete(&self, id: &FriendshipId) -> Result<(), StoreError>;

    /// Point-in-time query: all friendships involving `user` with the given
    /// status.
    async fn list_for_user(
        &self,
        user: UserId,
        status: FriendshipStatus,
    ) -> Result<Vec<Friendship>, StoreError>;

    /// Pushes the full current matching set immediately and again on every
    /// underlying mutation, until the returned handle is cancelled.
    async fn subscribe_for_user(
        &self,
        user: UserId,
        status: FriendshipStatus,
        snapshots: Sender<Vec<Friendship>>,
    ) -> Result<Subscription, StoreError>;
}
