use crate::domain_model::*;
use crate::domain_port::StoreError;
use tokio::sync::mpsc::Sender;

#[derive(Debug, thiserror::Error)]
pub enum FriendError {
    #[error("cannot send a friend request to yourself")]
    SelfRequest,
    #[error("friendship already established")]
    AlreadyFriends,
    #[error("friend request already pending")]
    RequestPending,
    #[error("friend request not possible")]
    Blocked,
    #[error("friendship not found")]
    NotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("not a participant of this friendship")]
    NotParticipant,
    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for FriendError {
    fn from(e: StoreError) -> Self {
        FriendError::Store(e.to_string())
    }
}

/// Partial consent update; only the provided fields change. `can_trade`
/// applies to the acting user's own slot, never the counterpart's.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsentUpdate {
    pub can_trade: Option<bool>,
    pub can_chat: Option<bool>,
}

#[async_trait::async_trait]
pub trait FriendshipService: Send + Sync {
    /// Creates a `pending` friendship for the pair. The receiver learns of
    /// it through their own subscription; no command-side notification.
    async fn send_request(&self, from: UserId, to: UserId) -> Result<FriendshipId, FriendError>;

    async fn accept_request(&self, id: &FriendshipId) -> Result<(), FriendError>;

    /// Deletes the request. When `declined_by` is given and is not the
    /// original initiator, the initiator is notified with the decliner's
    /// name; cancelling your own outgoing request notifies nobody.
    async fn decline_request(
        &self,
        id: &FriendshipId,
        declined_by: Option<UserId>,
    ) -> Result<(), FriendError>;

    /// Blocking retains the record with status `blocked`; otherwise the
    /// record is deleted outright.
    async fn remove_friend(&self, id: &FriendshipId, block: bool) -> Result<(), FriendError>;

    async fn update_consent(
        &self,
        id: &FriendshipId,
        acting_user: UserId,
        update: ConsentUpdate,
    ) -> Result<(), FriendError>;

    /// Full eligibility gate consulted before any trade is created or
    /// executed: global toggles, accepted friendship, both consent flags.
    async fn can_users_trade(&self, a: UserId, b: UserId)
        -> Result<TradeEligibility, FriendError>;

    async fn get_friendship(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<Friendship>, FriendError>;

    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, FriendError>;

    async fn get_friends(&self, user: UserId) -> Result<Vec<Friend>, FriendError>;

    async fn get_friend_requests(&self, user: UserId)
        -> Result<Vec<PendingRequest>, FriendError>;

    async fn friendship_stats(&self, user: UserId) -> Result<FriendshipStats, FriendError>;

    /// Live friend list. Re-delivers the full current set on every change;
    /// newly accepted friendships are notified once per device.
    async fn subscribe_friends(
        &self,
        user: UserId,
        snapshots: Sender<Vec<Friend>>,
    ) -> Result<(), FriendError>;

    /// Live pending-request list; unseen incoming requests are notified
    /// once per device.
    async fn subscribe_friend_requests(
        &self,
        user: UserId,
        snapshots: Sender<Vec<PendingRequest>>,
    ) -> Result<(), FriendError>;

    /// Called when the user opens the friends tab; suppresses notifications
    /// for everything currently visible.
    async fn mark_all_requests_seen(&self, user: UserId) -> Result<(), FriendError>;

    async fn unsubscribe_friends(&self, user: UserId);

    async fn unsubscribe_friend_requests(&self, user: UserId);

    /// Cancels every live subscription; used on sign-out.
    async fn unsubscribe_all(&self);
}
