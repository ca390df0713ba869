use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of rarity tiers as they occur in stored data.
///
/// `UltraRare` shows up in legacy saves and in sort order but is never
/// produced by card generation; it is kept so old documents still decode.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
    UltraRare,
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
            Rarity::UltraRare => "ultra-rare",
        };
        write!(f, "{s}")
    }
}

/// A card as it lives in a player's collection or deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    /// Stable instance id. Older saves may lack it, in which case identity
    /// falls back to name + rarity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub emoji: String,
    pub attack: i32,
    pub defense: i32,
    pub health: i32,
    pub rarity: Rarity,
    pub description: String,
}

impl Card {
    /// Identity match used everywhere cards are compared across documents:
    /// stable id when both carry one, structural name + rarity otherwise.
    pub fn matches(&self, other: &Card) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) if a == b => true,
            _ => self.name == other.name && self.rarity == other.rarity,
        }
    }
}

/// Denormalized snapshot of a card's tradeable attributes. Self-describing:
/// a trade offer stays valid even if the source card object later mutates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradedCard {
    pub card_key: String,
    pub name: String,
    pub rarity: Rarity,
    pub attack: i32,
    pub defense: i32,
    pub health: i32,
    pub description: String,
    pub emoji: String,
}

impl TradedCard {
    pub fn from_card(card: &Card) -> Self {
        let card_key = card
            .id
            .clone()
            .unwrap_or_else(|| format!("{}_{}", card.name, card.rarity));
        Self {
            card_key,
            name: card.name.clone(),
            rarity: card.rarity,
            attack: card.attack,
            defense: card.defense,
            health: card.health,
            description: card.description.clone(),
            emoji: card.emoji.clone(),
        }
    }

    pub fn to_card(&self) -> Card {
        Card {
            id: Some(self.card_key.clone()),
            name: self.name.clone(),
            emoji: self.emoji.clone(),
            attack: self.attack,
            defense: self.defense,
            health: self.health,
            rarity: self.rarity,
            description: self.description.clone(),
        }
    }
}

/// Pure ownership check: does `collection` contain every card in `wanted`.
///
/// Each wanted card is checked independently; duplicate handling happens at
/// removal time, where matches are consumed one by one.
pub fn owns_all(collection: &[Card], wanted: &[Card]) -> bool {
    wanted
        .iter()
        .all(|w| collection.iter().any(|owned| owned.matches(w)))
}

/// Remove the first match for each card in `to_remove` from `collection`.
/// Cards without a match are skipped; the caller is expected to have
/// validated ownership first.
pub fn remove_cards(collection: &mut Vec<Card>, to_remove: &[Card]) {
    for card in to_remove {
        if let Some(pos) = collection.iter().position(|owned| owned.matches(card)) {
            collection.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: Option<&str>, name: &str, rarity: Rarity) -> Card {
        Card {
            id: id.map(str::to_owned),
            name: name.to_owned(),
            emoji: "🐉".to_owned(),
            attack: 5,
            defense: 3,
            health: 10,
            rarity,
            description: "test card".to_owned(),
        }
    }

    #[test]
    fn matches_prefers_stable_id() {
        let a = card(Some("m1"), "Feuerdrache", Rarity::Epic);
        let b = card(Some("m1"), "Renamed", Rarity::Common);
        assert!(a.matches(&b));
    }

    #[test]
    fn matches_falls_back_to_name_and_rarity() {
        let a = card(None, "Waldgeist", Rarity::Rare);
        let b = card(Some("m2"), "Waldgeist", Rarity::Rare);
        assert!(a.matches(&b));
        assert!(!a.matches(&card(None, "Waldgeist", Rarity::Epic)));
    }

    #[test]
    fn owns_all_checks_every_card() {
        let collection = vec![
            card(Some("m1"), "Feuerdrache", Rarity::Epic),
            card(Some("m2"), "Waldgeist", Rarity::Rare),
        ];
        assert!(owns_all(&collection, &collection.clone()));
        assert!(!owns_all(
            &collection,
            &[card(Some("m3"), "Blitzwolf", Rarity::Rare)]
        ));
    }

    #[test]
    fn remove_consumes_one_match_per_card() {
        let mut collection = vec![
            card(None, "Waldgeist", Rarity::Rare),
            card(None, "Waldgeist", Rarity::Rare),
        ];
        remove_cards(&mut collection, &[card(None, "Waldgeist", Rarity::Rare)]);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn traded_card_round_trip_keeps_identity() {
        let original = card(Some("m1"), "Feuerdrache", Rarity::Epic);
        let snapshot = TradedCard::from_card(&original);
        assert_eq!(snapshot.card_key, "m1");
        assert!(snapshot.to_card().matches(&original));
    }

    #[test]
    fn traded_card_synthesizes_key_when_id_missing() {
        let snapshot = TradedCard::from_card(&card(None, "Blitzwolf", Rarity::Rare));
        assert_eq!(snapshot.card_key, "Blitzwolf_rare");
    }
}
