use crate::domain_model::{TradedCard, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Advisory expiry horizon stamped on new trades. External cleanup may act
/// on it; this core never self-expires a trade.
pub const TRADE_EXPIRY_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TradeId(pub uuid::Uuid);

impl TradeId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Responded,
    Accepted,
    Declined,
    Cancelled,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeStatus::Accepted | TradeStatus::Declined | TradeStatus::Cancelled
        )
    }

    /// The statuses in which a trade still occupies the pair, blocking a
    /// second proposal in either direction.
    pub fn is_active(&self) -> bool {
        matches!(self, TradeStatus::Pending | TradeStatus::Responded)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Responded => "responded",
            TradeStatus::Accepted => "accepted",
            TradeStatus::Declined => "declined",
            TradeStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TradeSide {
    Initiator,
    Receiver,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Initiator => write!(f, "initiator"),
            TradeSide::Receiver => write!(f, "receiver"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeParty {
    pub user_id: UserId,
    pub nickname: String,
}

/// A proposed exchange of cards between two friends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    pub id: TradeId,
    pub initiator: TradeParty,
    /// Non-empty from creation on.
    pub offered_cards: Vec<TradedCard>,
    pub receiver: TradeParty,
    /// Set, non-empty, exactly when the receiver has countered.
    pub requested_cards: Option<Vec<TradedCard>>,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Strictly increases on every state-changing write. Used to reason
    /// about stale reads; the store does not enforce it.
    pub version: u32,
    pub initiator_seen: bool,
    pub receiver_seen: bool,
}

/// State-changing writes a trade document accepts. Applied by the store
/// under its entry lock so the status precondition and the mutation land in
/// the same write.
#[derive(Debug, Clone)]
pub enum TradeTransition {
    Respond {
        requested_cards: Vec<TradedCard>,
        at: DateTime<Utc>,
    },
    Accept {
        at: DateTime<Utc>,
    },
    Decline {
        by: TradeSide,
        at: DateTime<Utc>,
    },
    Cancel {
        at: DateTime<Utc>,
    },
    /// Compensation path: reopens a claimed accept when the exchange could
    /// not be carried out, returning the trade to `responded`.
    Reopen {
        at: DateTime<Utc>,
    },
}

impl TradeRequest {
    pub fn new_pending(
        initiator: TradeParty,
        receiver: TradeParty,
        offered_cards: Vec<TradedCard>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TradeId::generate(),
            initiator,
            offered_cards,
            receiver,
            requested_cards: None,
            status: TradeStatus::Pending,
            created_at: now,
            expires_at: now + Duration::days(TRADE_EXPIRY_DAYS),
            responded_at: None,
            completed_at: None,
            version: 1,
            initiator_seen: true,
            receiver_seen: false,
        }
    }

    pub fn is_party(&self, user: UserId) -> bool {
        self.initiator.user_id == user || self.receiver.user_id == user
    }

    pub fn side_of(&self, user: UserId) -> Option<TradeSide> {
        if self.initiator.user_id == user {
            Some(TradeSide::Initiator)
        } else if self.receiver.user_id == user {
            Some(TradeSide::Receiver)
        } else {
            None
        }
    }

    pub fn mark_seen_by(&mut self, side: TradeSide) {
        match side {
            TradeSide::Initiator => self.initiator_seen = true,
            TradeSide::Receiver => self.receiver_seen = true,
        }
    }

    /// Applies a transition in place. Status preconditions are the caller's
    /// responsibility (the store checks them under its lock); this method
    /// only performs the field mutations and the version bump.
    pub fn apply(&mut self, transition: &TradeTransition) {
        self.version += 1;
        match transition {
            TradeTransition::Respond {
                requested_cards,
                at,
            } => {
                self.requested_cards = Some(requested_cards.clone());
                self.status = TradeStatus::Responded;
                self.responded_at = Some(*at);
                // The counter-offer is the initiator's turn to look at.
                self.receiver_seen = true;
                self.initiator_seen = false;
            }
            TradeTransition::Accept { at } => {
                self.status = TradeStatus::Accepted;
                self.completed_at = Some(*at);
                self.initiator_seen = true;
                self.receiver_seen = false;
            }
            TradeTransition::Decline { by, at } => {
                self.status = TradeStatus::Declined;
                self.completed_at = Some(*at);
                if *by == TradeSide::Initiator {
                    self.initiator_seen = true;
                    self.receiver_seen = false;
                }
            }
            TradeTransition::Cancel { at } => {
                self.status = TradeStatus::Cancelled;
                self.completed_at = Some(*at);
            }
            TradeTransition::Reopen { at } => {
                self.status = TradeStatus::Responded;
                self.completed_at = None;
                self.responded_at = Some(*at);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::Rarity;

    fn party(n: u128, nickname: &str) -> TradeParty {
        TradeParty {
            user_id: UserId(uuid::Uuid::from_u128(n)),
            nickname: nickname.to_owned(),
        }
    }

    fn snapshot(name: &str) -> TradedCard {
        TradedCard {
            card_key: name.to_owned(),
            name: name.to_owned(),
            rarity: Rarity::Rare,
            attack: 1,
            defense: 1,
            health: 1,
            description: String::new(),
            emoji: "⚡".to_owned(),
        }
    }

    #[test]
    fn new_trade_starts_pending_with_week_expiry() {
        let now = Utc::now();
        let trade = TradeRequest::new_pending(
            party(1, "alice"),
            party(2, "bert"),
            vec![snapshot("Feuerdrache")],
            now,
        );
        assert_eq!(trade.status, TradeStatus::Pending);
        assert_eq!(trade.expires_at, now + Duration::days(7));
        assert_eq!(trade.version, 1);
        assert!(trade.initiator_seen);
        assert!(!trade.receiver_seen);
    }

    #[test]
    fn respond_flips_turn_to_initiator() {
        let now = Utc::now();
        let mut trade = TradeRequest::new_pending(
            party(1, "alice"),
            party(2, "bert"),
            vec![snapshot("Feuerdrache")],
            now,
        );
        trade.apply(&TradeTransition::Respond {
            requested_cards: vec![snapshot("Waldgeist")],
            at: now,
        });
        assert_eq!(trade.status, TradeStatus::Responded);
        assert_eq!(trade.version, 2);
        assert!(!trade.initiator_seen);
        assert!(trade.receiver_seen);
        assert!(trade.requested_cards.is_some());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TradeStatus::Accepted.is_terminal());
        assert!(TradeStatus::Declined.is_terminal());
        assert!(TradeStatus::Cancelled.is_terminal());
        assert!(TradeStatus::Pending.is_active());
        assert!(TradeStatus::Responded.is_active());
    }
}
