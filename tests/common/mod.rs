use chrono::Utc;
use std::sync::{Arc, Mutex};
use tradepost::application_impl::{RealFriendshipService, RealTradeService, SeenTracker};
use tradepost::application_port::{FriendshipService, TradeService};
use tradepost::domain_model::*;
use tradepost::domain_port::{NotificationDispatch, PlayerRepo, SeenStore};
use tradepost::infra_mem::*;

/// Dispatch stub that records every delivered notification.
pub struct RecordingDispatch {
    sent: Mutex<Vec<(UserId, Notification)>>,
}

impl RecordingDispatch {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<(UserId, Notification)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, target: UserId) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|(user, _)| *user == target)
            .map(|(_, n)| n)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait::async_trait]
impl NotificationDispatch for RecordingDispatch {
    async fn notify(&self, target: UserId, notification: Notification) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((target, notification));
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemStore>,
    pub dispatch: Arc<RecordingDispatch>,
    pub friendships: Arc<dyn FriendshipService>,
    pub trades: Arc<dyn TradeService>,
    pub player_repo: Arc<dyn PlayerRepo>,
}

/// Fully wired stack over the in-memory backend. Seen ledgers start empty
/// and live in `MemSeenStore`, so notification-suppression behavior is
/// deterministic per harness.
pub async fn harness() -> Harness {
    let store = Arc::new(MemStore::new());
    let dispatch = Arc::new(RecordingDispatch::new());
    let seen_store: Arc<dyn SeenStore> = Arc::new(MemSeenStore::new());

    let player_repo: Arc<dyn PlayerRepo> = Arc::new(MemPlayerRepo::new(store.clone()));
    let friendships: Arc<dyn FriendshipService> = Arc::new(RealFriendshipService::new(
        Arc::new(MemFriendshipRepo::new(store.clone())),
        player_repo.clone(),
        dispatch.clone(),
        Arc::new(SeenTracker::load(seen_store.clone(), "requests").await),
        Arc::new(SeenTracker::load(seen_store.clone(), "friendships").await),
    ));
    let trades: Arc<dyn TradeService> = Arc::new(RealTradeService::new(
        Arc::new(MemTradeRepo::new(store.clone())),
        player_repo.clone(),
        friendships.clone(),
        dispatch.clone(),
        Arc::new(SeenTracker::load(seen_store, "trades").await),
    ));

    Harness {
        store,
        dispatch,
        friendships,
        trades,
        player_repo,
    }
}

pub fn uid(n: u128) -> UserId {
    UserId(uuid::Uuid::from_u128(n))
}

pub fn card(id: &str, name: &str, rarity: Rarity) -> Card {
    Card {
        id: Some(id.to_owned()),
        name: name.to_owned(),
        emoji: "🃏".to_owned(),
        attack: 5,
        defense: 3,
        health: 10,
        rarity,
        description: format!("{name} test card"),
    }
}

pub fn save_with(cards: Vec<Card>) -> PlayerSave {
    PlayerSave::new(50, cards, Vec::new(), Utc::now())
}

/// Registers a player with a profile and a collection.
pub fn seed_player(h: &Harness, user: UserId, nickname: &str, collection: Vec<Card>) {
    let now = Utc::now();
    h.store.upsert_profile(UserProfile {
        user_id: user,
        nickname: nickname.to_owned(),
        friend_code: format!("{}-CODE", nickname.to_uppercase()),
        trading_enabled: true,
        created_at: now,
        last_active: now,
    });
    h.store.upsert_save(user, save_with(collection));
}

pub fn disable_trading_globally(h: &Harness, user: UserId) {
    let mut profile = h
        .store
        .profile_of(user)
        .expect("profile must be seeded first");
    profile.trading_enabled = false;
    h.store.upsert_profile(profile);
}

/// Sends and accepts a friend request, returning the friendship id.
pub async fn befriend(h: &Harness, a: UserId, b: UserId) -> FriendshipId {
    let id = h.friendships.send_request(a, b).await.unwrap();
    h.friendships.accept_request(&id).await.unwrap();
    id
}

pub fn collection_names(save: &PlayerSave) -> Vec<String> {
    let mut names: Vec<String> = save.collection.iter().map(|c| c.name.clone()).collect();
    names.sort();
    names
}
