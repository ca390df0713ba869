use crate::domain_model::Card;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A player's persisted game data. This core only ever rewrites
/// `collection` (the trade exchange); coins and deck belong to the shop and
/// deck-building subsystems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSave {
    pub coins: u64,
    pub collection: Vec<Card>,
    pub deck: Vec<Card>,
    pub last_saved: DateTime<Utc>,
}

impl PlayerSave {
    pub fn new(coins: u64, collection: Vec<Card>, deck: Vec<Card>, now: DateTime<Utc>) -> Self {
        Self {
            coins,
            collection,
            deck,
            last_saved: now,
        }
    }
}
