use crate::domain_port::SeenStore;
use dashmap::DashMap;
use std::collections::HashSet;

/// Volatile seen-ledger backing. Survives reconnects within one process,
/// nothing more; demos and tests use it where the filesystem store would
/// only add noise.
#[derive(Default)]
pub struct MemSeenStore {
    ledgers: DashMap<String, HashSet<String>>,
}

impl MemSeenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SeenStore for MemSeenStore {
    async fn load(&self, ledger: &str) -> anyhow::Result<HashSet<String>> {
        Ok(self
            .ledgers
            .get(ledger)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }

    async fn save(&self, ledger: &str, ids: &HashSet<String>) -> anyhow::Result<()> {
        self.ledgers.insert(ledger.to_owned(), ids.clone());
        Ok(())
    }
}
