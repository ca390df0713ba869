use crate::domain_model::*;
use crate::domain_port::StoreError;
use dashmap::{DashMap, DashSet};
use tokio::sync::broadcast;

/// In-process document store backing every repo in this backend. Change
/// feeds are coarse: one broadcast per collection, and subscribers recompute
/// their full snapshot on every tick, which matches the snapshot-push
/// contract of the repo subscriptions.
pub struct MemStore {
    pub(super) friendships: DashMap<FriendshipId, Friendship>,
    pub(super) trades: DashMap<TradeId, TradeRequest>,
    pub(super) profiles: DashMap<UserId, UserProfile>,
    pub(super) saves: DashMap<UserId, PlayerSave>,
    pub(super) presence: DashMap<UserId, Presence>,
    pub(super) friendship_feed: broadcast::Sender<()>,
    pub(super) trade_feed: broadcast::Sender<()>,
    failing_saves: DashSet<UserId>,
}

impl MemStore {
    pub fn new() -> Self {
        let (friendship_feed, _) = broadcast::channel(64);
        let (trade_feed, _) = broadcast::channel(64);
        Self {
            friendships: DashMap::new(),
            trades: DashMap::new(),
            profiles: DashMap::new(),
            saves: DashMap::new(),
            presence: DashMap::new(),
            friendship_feed,
            trade_feed,
            failing_saves: DashSet::new(),
        }
    }

    pub fn upsert_profile(&self, profile: UserProfile) {
        self.profiles.insert(profile.user_id, profile);
    }

    pub fn profile_of(&self, user: UserId) -> Option<UserProfile> {
        self.profiles.get(&user).map(|e| e.value().clone())
    }

    pub fn upsert_save(&self, user: UserId, save: PlayerSave) {
        self.saves.insert(user, save);
    }

    pub fn set_presence(&self, user: UserId, presence: Presence) {
        self.presence.insert(user, presence);
    }

    /// Makes every subsequent save write for `user` fail, until healed.
    /// Test hook for exercising partial-exchange handling.
    pub fn fail_saves_for(&self, user: UserId) {
        self.failing_saves.insert(user);
    }

    pub fn heal_saves_for(&self, user: UserId) {
        self.failing_saves.remove(&user);
    }

    pub(super) fn check_save_writable(&self, user: UserId) -> Result<(), StoreError> {
        if self.failing_saves.contains(&user) {
            return Err(StoreError::Unavailable(format!(
                "save writes disabled for {user}"
            )));
        }
        Ok(())
    }

    pub(super) fn friendships_for(
        &self,
        user: UserId,
        status: FriendshipStatus,
    ) -> Vec<Friendship> {
        let mut out: Vec<Friendship> = self
            .friendships
            .iter()
            .filter(|e| e.status == status && e.is_participant(user))
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|f| f.created_at);
        out
    }

    pub(super) fn active_trades_for(&self, user: UserId) -> Vec<TradeRequest> {
        let mut out: Vec<TradeRequest> = self
            .trades
            .iter()
            .filter(|e| e.status.is_active() && e.is_party(user))
            .map(|e| e.value().clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    pub(super) fn notify_friendships(&self) {
        let _ = self.friendship_feed.send(());
    }

    pub(super) fn notify_trades(&self) {
        let _ = self.trade_feed.send(());
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}
