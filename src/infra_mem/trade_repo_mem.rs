use crate::domain_model::*;
use crate::domain_port::{StoreError, Subscription, TradeRepo, TransitionOutcome};
use crate::infra_mem::MemStore;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

pub struct MemTradeRepo {
    store: Arc<MemStore>,
}

impl MemTradeRepo {
    pub fn new(store: Arc<MemStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl TradeRepo for MemTradeRepo {
    async fn get(&self, id: &TradeId) -> Result<Option<TradeRequest>, StoreError> {
        Ok(self.store.trades.get(id).map(|e| e.value().clone()))
    }

    async fn put(&self, trade: &TradeRequest) -> Result<(), StoreError> {
        self.store.trades.insert(trade.id, trade.clone());
        self.store.notify_trades();
        Ok(())
    }

    async fn apply_transition(
        &self,
        id: &TradeId,
        expected: &[TradeStatus],
        transition: TradeTransition,
    ) -> Result<TransitionOutcome, StoreError> {
        // The entry guard is the write lock: the status check and the
        // mutation are not interleavable with another transition.
        let outcome = match self.store.trades.get_mut(id) {
            None => TransitionOutcome::Missing,
            Some(mut entry) => {
                if !expected.contains(&entry.status) {
                    TransitionOutcome::StatusMismatch(entry.status)
                } else {
                    entry.apply(&transition);
                    TransitionOutcome::Applied(entry.value().clone())
                }
            }
        };
        if matches!(outcome, TransitionOutcome::Applied(_)) {
            self.store.notify_trades();
        }
        Ok(outcome)
    }

    async fn mark_seen(&self, id: &TradeId, user: UserId) -> Result<bool, StoreError> {
        let Some(mut entry) = self.store.trades.get_mut(id) else {
            return Ok(false);
        };
        if let Some(side) = entry.side_of(user) {
            entry.mark_seen_by(side);
        }
        drop(entry);
        self.store.notify_trades();
        Ok(true)
    }

    async fn list_active_for_user(&self, user: UserId) -> Result<Vec<TradeRequest>, StoreError> {
        Ok(self.store.active_trades_for(user))
    }

    async fn find_active_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<TradeRequest>, StoreError> {
        Ok(self
            .store
            .trades
            .iter()
            .find(|e| e.status.is_active() && e.is_party(a) && e.is_party(b))
            .map(|e| e.value().clone()))
    }

    async fn subscribe_active_for_user(
        &self,
        user: UserId,
        snapshots: Sender<Vec<TradeRequest>>,
    ) -> Result<Subscription, StoreError> {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let store = self.store.clone();
        let mut feed = self.store.trade_feed.subscribe();

        let task = tokio::spawn(async move {
            if snapshots.send(store.active_trades_for(user)).await.is_err() {
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
                        if snapshots.send(store.active_trades_for(user)).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Ok(Subscription::new(token, task))
    }
}
