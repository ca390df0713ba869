use crate::domain_model::{Presence, UserId, UserPair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic friendship document key: the two user ids joined in
/// sorted order, so the pair maps to at most one record.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FriendshipId(pub String);

impl FriendshipId {
    pub fn for_pair(a: UserId, b: UserId) -> Self {
        let pair = UserPair::new(a, b);
        Self(format!("{}_{}", pair.min(), pair.max()))
    }
}

impl fmt::Display for FriendshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Blocked,
}

impl fmt::Display for FriendshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
            FriendshipStatus::Blocked => "blocked",
        };
        write!(f, "{s}")
    }
}

/// The relationship record between exactly two users. Owned collectively by
/// both participants; each side may only flip its own consent flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    pub id: FriendshipId,
    pub user_min: UserId,
    pub user_max: UserId,
    pub status: FriendshipStatus,
    pub initiated_by: UserId,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub last_activity: DateTime<Utc>,
    /// Per-slot trading consent, default true on creation.
    pub min_can_trade: bool,
    pub max_can_trade: bool,
    /// Shared flag, not per-slot.
    pub can_chat: bool,
}

impl Friendship {
    pub fn new_pending(initiator: UserId, other: UserId, now: DateTime<Utc>) -> Self {
        let pair = UserPair::new(initiator, other);
        Self {
            id: FriendshipId::for_pair(initiator, other),
            user_min: pair.min(),
            user_max: pair.max(),
            status: FriendshipStatus::Pending,
            initiated_by: initiator,
            created_at: now,
            accepted_at: None,
            last_activity: now,
            min_can_trade: true,
            max_can_trade: true,
            can_chat: true,
        }
    }

    pub fn pair(&self) -> UserPair {
        UserPair::new(self.user_min, self.user_max)
    }

    pub fn is_participant(&self, user: UserId) -> bool {
        self.pair().contains(user)
    }

    pub fn other_of(&self, user: UserId) -> Option<UserId> {
        self.pair().other(user)
    }

    /// Trading consent of `user`'s own slot.
    pub fn consents_to_trade(&self, user: UserId) -> bool {
        if user == self.user_min {
            self.min_can_trade
        } else {
            self.max_can_trade
        }
    }

    pub fn set_trade_consent(&mut self, user: UserId, allow: bool) {
        if user == self.user_min {
            self.min_can_trade = allow;
        } else {
            self.max_can_trade = allow;
        }
    }
}

/// The specific reason a trade between two users is not allowed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TradeDenial {
    /// The named user has switched trading off globally.
    GloballyDisabled(UserId),
    NotFriends,
    Blocked,
    /// The named user revoked trading consent for this friendship.
    OptedOut(UserId),
}

impl fmt::Display for TradeDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeDenial::GloballyDisabled(user) => {
                write!(f, "user {user} has trading disabled globally")
            }
            TradeDenial::NotFriends => write!(f, "users are not friends"),
            TradeDenial::Blocked => write!(f, "friendship is blocked"),
            TradeDenial::OptedOut(user) => {
                write!(f, "user {user} does not allow trading in this friendship")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TradeEligibility {
    Allowed,
    Denied(TradeDenial),
}

/// Derived friend view for one side of an accepted friendship. Never
/// persisted; rebuilt from the friendship record, the counterpart's profile
/// and live presence on every read.
#[derive(Debug, Clone)]
pub struct Friend {
    pub user_id: UserId,
    pub nickname: String,
    pub friend_code: String,
    pub friendship_id: FriendshipId,
    pub is_online: bool,
    pub last_active: DateTime<Utc>,
    pub i_allow_trading: bool,
    pub friend_allows_trading: bool,
    pub can_chat: bool,
}

impl Friend {
    pub fn from_friendship(
        me: UserId,
        friendship: &Friendship,
        counterpart_nickname: String,
        counterpart_friend_code: String,
        presence: Presence,
    ) -> Option<Self> {
        let other = friendship.other_of(me)?;
        Some(Self {
            user_id: other,
            nickname: counterpart_nickname,
            friend_code: counterpart_friend_code,
            friendship_id: friendship.id.clone(),
            is_online: presence.is_online,
            last_active: presence.last_seen.unwrap_or(friendship.last_activity),
            i_allow_trading: friendship.consents_to_trade(me),
            friend_allows_trading: friendship.consents_to_trade(other),
            can_chat: friendship.can_chat,
        })
    }
}

/// Pending friend-request view for one side of a `pending` friendship.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub friendship_id: FriendshipId,
    pub counterpart: UserId,
    pub counterpart_nickname: String,
    /// True when someone else sent this request to us.
    pub incoming: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct FriendshipStats {
    pub total_friends: usize,
    pub pending_requests: usize,
    pub sent_requests: usize,
}
