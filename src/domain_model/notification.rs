use serde::{Deserialize, Serialize};
use std::fmt;

/// Game tab a delivered notification navigates to on click-through (the
/// `switch_tab` hook of the game shell).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameTab {
    Friends,
    Trades,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    FriendRequest,
    RequestAccepted,
    RequestDeclined,
    FriendAdded,
    TradeRequest,
    TradeResponse,
    TradeAccepted,
    TradeDeclined,
}

impl NotificationKind {
    pub fn tab(&self) -> GameTab {
        match self {
            NotificationKind::FriendRequest
            | NotificationKind::RequestAccepted
            | NotificationKind::RequestDeclined
            | NotificationKind::FriendAdded => GameTab::Friends,
            NotificationKind::TradeRequest
            | NotificationKind::TradeResponse
            | NotificationKind::TradeAccepted
            | NotificationKind::TradeDeclined => GameTab::Trades,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationKind::FriendRequest => "friend-request",
            NotificationKind::RequestAccepted => "request-accepted",
            NotificationKind::RequestDeclined => "request-declined",
            NotificationKind::FriendAdded => "friend-added",
            NotificationKind::TradeRequest => "trade-request",
            NotificationKind::TradeResponse => "trade-response",
            NotificationKind::TradeAccepted => "trade-accepted",
            NotificationKind::TradeDeclined => "trade-declined",
        };
        write!(f, "{s}")
    }
}

/// One-shot event payload handed to the dispatcher. Delivery is
/// at-least-once and may land on any of the target's devices; duplicate
/// suppression is the receiving device's job (seen ledger).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Nickname of the user whose action triggered the event.
    pub actor_nickname: String,
    /// Number of cards involved, where the kind carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_count: Option<usize>,
    pub tab: GameTab,
}

impl Notification {
    pub fn new(kind: NotificationKind, actor_nickname: impl Into<String>) -> Self {
        Self {
            kind,
            actor_nickname: actor_nickname.into(),
            card_count: None,
            tab: kind.tab(),
        }
    }

    pub fn with_card_count(mut self, count: usize) -> Self {
        self.card_count = Some(count);
        self
    }
}
