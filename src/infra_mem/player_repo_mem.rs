use crate::domain_model::*;
use crate::domain_port::{PlayerRepo, StoreError};
use crate::infra_mem::MemStore;
use std::collections::HashMap;
use std::sync::Arc;

pub struct MemPlayerRepo {
    store: Arc<MemStore>,
}

impl MemPlayerRepo {
    pub fn new(store: Arc<MemStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl PlayerRepo for MemPlayerRepo {
    async fn get_profile(&self, user: UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.store.profiles.get(&user).map(|e| e.value().clone()))
    }

    async fn get_save(&self, user: UserId) -> Result<Option<PlayerSave>, StoreError> {
        Ok(self.store.saves.get(&user).map(|e| e.value().clone()))
    }

    async fn put_save(&self, user: UserId, save: &PlayerSave) -> Result<(), StoreError> {
        self.store.check_save_writable(user)?;
        self.store.saves.insert(user, save.clone());
        Ok(())
    }

    async fn get_presence(
        &self,
        users: &[UserId],
    ) -> Result<HashMap<UserId, Presence>, StoreError> {
        let mut out = HashMap::with_capacity(users.len());
        for user in users {
            let presence = self
                .store
                .presence
                .get(user)
                .map(|e| *e.value())
                .unwrap_or_default();
            out.insert(*user, presence);
        }
        Ok(out)
    }
}
