use crate::domain_model::*;
use crate::domain_port::StoreError;
use tokio::sync::mpsc::Sender;

#[derive(Debug, thiserror::Error)]
pub enum TradeError {
    #[error("trading not allowed: {0}")]
    NotAllowed(TradeDenial),
    #[error("an active trade already exists between these users")]
    DuplicateRequest,
    #[error("a trade offer must contain at least one card")]
    EmptyOffer,
    #[error("at least one card must be selected for the counter-offer")]
    EmptySelection,
    #[error("{0} no longer owns all committed cards")]
    OwnershipViolation(TradeSide),
    #[error("only the {0} may perform this action")]
    NotAuthorized(TradeSide),
    #[error("trade is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: TradeStatus,
    },
    #[error("trade not found")]
    NotFound,
    #[error("user data not found")]
    UserNotFound,
    #[error("store error: {0}")]
    Store(String),
    /// One collection write landed and the other failed. Collections are
    /// out of sync and need manual reconciliation; never retried here.
    #[error("exchange left collections inconsistent, manual reconciliation required: {0}")]
    ExchangeInconsistent(String),
}

impl From<StoreError> for TradeError {
    fn from(e: StoreError) -> Self {
        TradeError::Store(e.to_string())
    }
}

#[async_trait::async_trait]
pub trait TradeService: Send + Sync {
    /// Opens a trade: eligibility gate, duplicate check in both directions,
    /// ownership of the offer, then a `pending` document with a 7-day
    /// expiry. Notifies the receiver.
    async fn create_trade_request(
        &self,
        initiator: UserId,
        receiver: UserId,
        offered_cards: Vec<Card>,
    ) -> Result<TradeId, TradeError>;

    /// Receiver counters with their own card selection; `pending` only.
    /// Notifies the initiator.
    async fn respond_to_trade_request(
        &self,
        trade_id: &TradeId,
        responder: UserId,
        requested_cards: Vec<Card>,
    ) -> Result<(), TradeError>;

    /// Initiator accepts or declines the counter-offer; `responded` only.
    /// Accepting re-validates both sides' ownership and performs the
    /// two-sided collection exchange.
    async fn finalize_trade_request(
        &self,
        trade_id: &TradeId,
        finalizer: UserId,
        accept: bool,
    ) -> Result<(), TradeError>;

    /// Initiator withdraws the proposal from `pending` or `responded`. The
    /// counterpart is deliberately not notified.
    async fn cancel_trade_request(
        &self,
        trade_id: &TradeId,
        canceller: UserId,
    ) -> Result<(), TradeError>;

    /// Receiver rejects an un-countered trade; `pending` only. Notifies the
    /// initiator.
    async fn decline_trade_request(
        &self,
        trade_id: &TradeId,
        decliner: UserId,
    ) -> Result<(), TradeError>;

    /// Active trades where `user` is either party, newest first.
    async fn get_trade_requests(&self, user: UserId) -> Result<Vec<TradeRequest>, TradeError>;

    /// Sets the durable per-party seen flag on the trade document.
    async fn mark_trade_seen(&self, trade_id: &TradeId, user: UserId)
        -> Result<(), TradeError>;

    async fn subscribe_trade_requests(
        &self,
        user: UserId,
        snapshots: Sender<Vec<TradeRequest>>,
    ) -> Result<(), TradeError>;

    async fn unsubscribe_trade_requests(&self, user: UserId);

    async fn unsubscribe_all(&self);
}
