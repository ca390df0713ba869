use crate::domain_port::SeenStore;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Per-device idempotence ledger. Keeps an owned in-memory set of already
/// notified entity ids, hydrated from and persisted through a `SeenStore`,
/// so a reconnect that re-delivers the current state of all pending
/// requests does not re-fire their notifications.
///
/// Persistence is best-effort: a failed save costs at most one duplicate
/// notification after the next restart, which the dispatcher contract
/// already allows.
pub struct SeenTracker {
    store: Arc<dyn SeenStore>,
    ledger: String,
    seen: Mutex<HashSet<String>>,
}

impl SeenTracker {
    pub async fn load(store: Arc<dyn SeenStore>, ledger: &str) -> Self {
        let seen = match store.load(ledger).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("failed to load seen ledger '{ledger}': {e:#}");
                HashSet::new()
            }
        };
        Self {
            store,
            ledger: ledger.to_owned(),
            seen: Mutex::new(seen),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen
            .lock()
            .map(|seen| seen.contains(id))
            .unwrap_or(false)
    }

    pub async fn mark(&self, id: &str) {
        self.mark_many(std::iter::once(id.to_owned())).await;
    }

    pub async fn mark_many(&self, ids: impl IntoIterator<Item = String>) {
        let snapshot = {
            let Ok(mut seen) = self.seen.lock() else {
                return;
            };
            let mut changed = false;
            for id in ids {
                changed |= seen.insert(id);
            }
            if !changed {
                return;
            }
            seen.clone()
        };
        if let Err(e) = self.store.save(&self.ledger, &snapshot).await {
            tracing::warn!("failed to persist seen ledger '{}': {e:#}", self.ledger);
        }
    }
}
