use crate::domain_model::*;
use crate::domain_port::StoreError;
use std::collections::HashMap;

/// Read/write access to per-player records owned by the account subsystem.
/// This core reads profiles and presence, and rewrites saves only through
/// the trade exchange.
#[async_trait::async_trait]
pub trait PlayerRepo: Send + Sync {
    async fn get_profile(&self, user: UserId) -> Result<Option<UserProfile>, StoreError>;

    async fn get_save(&self, user: UserId) -> Result<Option<PlayerSave>, StoreError>;

    async fn put_save(&self, user: UserId, save: &PlayerSave) -> Result<(), StoreError>;

    /// Batch presence lookup; users without a presence record come back
    /// with the default (offline, no last-seen).
    async fn get_presence(
        &self,
        users: &[UserId],
    ) -> Result<HashMap<UserId, Presence>, StoreError>;
}
