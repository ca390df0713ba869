use crate::domain_model::*;
use crate::domain_port::{StoreError, Subscription};
use tokio::sync::mpsc::Sender;

/// Result of a compare-and-act transition write.
#[derive(Debug)]
pub enum TransitionOutcome {
    Applied(TradeRequest),
    /// The live status was not one of the expected ones; carries what it
    /// actually was. The write did not happen.
    StatusMismatch(TradeStatus),
    Missing,
}

#[async_trait::async_trait]
pub trait TradeRepo: Send + Sync {
    async fn get(&self, id: &TradeId) -> Result<Option<TradeRequest>, StoreError>;

    async fn put(&self, trade: &TradeRequest) -> Result<(), StoreError>;

    /// Re-reads the live status and applies `transition` in the same write.
    /// This is the sole concurrency guard against racing mutators; of two
    /// concurrent transitions at most one sees its expected status.
    async fn apply_transition(
        &self,
        id: &TradeId,
        expected: &[TradeStatus],
        transition: TradeTransition,
    ) -> Result<TransitionOutcome, StoreError>;

    /// Field-level write: flips `user`'s seen flag in place, leaving
    /// status, cards and version untouched, so a stale reader can never
    /// overwrite a concurrent transition. Returns false when the trade
    /// does not exist; a non-party user is a no-op.
    async fn mark_seen(&self, id: &TradeId, user: UserId) -> Result<bool, StoreError>;

    /// Active (pending or responded) trades where `user` is either party,
    /// newest first.
    async fn list_active_for_user(&self, user: UserId) -> Result<Vec<TradeRequest>, StoreError>;

    /// Any active trade between the two users, checked in both directions:
    /// a counter-proposal from the current receiver is blocked too.
    async fn find_active_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<TradeRequest>, StoreError>;

    async fn subscribe_active_for_user(
        &self,
        user: UserId,
        snapshots: Sender<Vec<TradeRequest>>,
    ) -> Result<Subscription, StoreError>;
}
