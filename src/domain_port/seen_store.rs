use std::collections::HashSet;

/// Per-device durable backing for a seen ledger. Keyed by ledger name so
/// one device can keep separate ledgers for requests, friendships and
/// trades.
#[async_trait::async_trait]
pub trait SeenStore: Send + Sync {
    async fn load(&self, ledger: &str) -> anyhow::Result<HashSet<String>>;

    async fn save(&self, ledger: &str, ids: &HashSet<String>) -> anyhow::Result<()>;
}
