use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tradepost::application_impl::*;
use tradepost::application_port::*;
use tradepost::domain_model::*;
use tradepost::domain_port::*;
use tradepost::infra_fs::FsSeenStore;
use tradepost::infra_mem::*;
use tradepost::logger::*;
use tradepost::settings::*;

fn profile(user: UserId, nickname: &str, friend_code: &str) -> UserProfile {
    let now = Utc::now();
    UserProfile {
        user_id: user,
        nickname: nickname.to_owned(),
        friend_code: friend_code.to_owned(),
        trading_enabled: true,
        created_at: now,
        last_active: now,
    }
}

fn card(id: &str, name: &str, emoji: &str, rarity: Rarity) -> Card {
    Card {
        id: Some(id.to_owned()),
        name: name.to_owned(),
        emoji: emoji.to_owned(),
        attack: 6,
        defense: 4,
        health: 12,
        rarity,
        description: format!("{name} demo card"),
    }
}

fn save_with(cards: Vec<Card>) -> PlayerSave {
    PlayerSave {
        coins: 100,
        collection: cards,
        deck: Vec::new(),
        last_saved: Utc::now(),
    }
}

/// Scripted walkthrough of the friendship and trading flows against the
/// in-memory backend, printing every notification as it is delivered.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    logger.reload_filter(&project_settings.log.filter)?;

    let settle = Duration::from_millis(project_settings.demo.settle_ms);

    let store = Arc::new(MemStore::new());
    let seen_store: Arc<dyn SeenStore> = match project_settings.seen.backend.as_str() {
        "fs" => Arc::new(FsSeenStore::new(&project_settings.seen.dir)),
        _ => Arc::new(MemSeenStore::new()),
    };
    let hub = Arc::new(NotifyHub::new());

    let alice = UserId(uuid::Uuid::new_v4());
    let bert = UserId(uuid::Uuid::new_v4());
    store.upsert_profile(profile(alice, "alice", "ALICE-001"));
    store.upsert_profile(profile(bert, "bert", "BERT-002"));
    store.set_presence(
        alice,
        Presence {
            is_online: true,
            last_seen: Some(Utc::now()),
        },
    );
    store.upsert_save(
        alice,
        save_with(vec![
            card("a1", "Feuerdrache", "🐉", Rarity::Epic),
            card("a2", "Blitzwolf", "🐺", Rarity::Rare),
        ]),
    );
    store.upsert_save(
        bert,
        save_with(vec![card("b1", "Waldgeist", "🌲", Rarity::Rare)]),
    );

    let friendship_repo: Arc<dyn FriendshipRepo> = Arc::new(MemFriendshipRepo::new(store.clone()));
    let trade_repo: Arc<dyn TradeRepo> = Arc::new(MemTradeRepo::new(store.clone()));
    let player_repo: Arc<dyn PlayerRepo> = Arc::new(MemPlayerRepo::new(store.clone()));
    let dispatch: Arc<dyn NotificationDispatch> = hub.clone();

    let friendship_service: Arc<dyn FriendshipService> = Arc::new(RealFriendshipService::new(
        friendship_repo,
        player_repo.clone(),
        dispatch.clone(),
        Arc::new(SeenTracker::load(seen_store.clone(), &format!("requests:{bert}")).await),
        Arc::new(SeenTracker::load(seen_store.clone(), &format!("friendships:{bert}")).await),
    ));
    let trade_service: Arc<dyn TradeService> = Arc::new(RealTradeService::new(
        trade_repo,
        player_repo.clone(),
        friendship_service.clone(),
        dispatch,
        Arc::new(SeenTracker::load(seen_store, &format!("trades:{bert}")).await),
    ));

    // Bert's device: push channel plus live request/trade views.
    let mut bert_notifications = hub.register(bert);
    let mut alice_notifications = hub.register(alice);
    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(n) = bert_notifications.recv() => {
                    info!("-> bert: {} from {} ({:?} tab)", n.kind, n.actor_nickname, n.tab);
                }
                Some(n) = alice_notifications.recv() => {
                    info!("-> alice: {} from {} ({:?} tab)", n.kind, n.actor_nickname, n.tab);
                }
                else => break,
            }
        }
    });

    let (requests_tx, mut requests_rx) = mpsc::channel(8);
    friendship_service
        .subscribe_friend_requests(bert, requests_tx)
        .await?;

    info!("alice sends bert a friend request");
    let friendship_id = friendship_service.send_request(alice, bert).await?;
    tokio::time::sleep(settle).await;
    while let Ok(batch) = requests_rx.try_recv() {
        info!("bert's pending requests: {}", batch.len());
    }

    info!("bert accepts");
    friendship_service.accept_request(&friendship_id).await?;
    assert!(friendship_service.are_friends(alice, bert).await?);

    info!("alice offers her Feuerdrache");
    let trade_id = trade_service
        .create_trade_request(alice, bert, vec![card("a1", "Feuerdrache", "🐉", Rarity::Epic)])
        .await?;

    info!("bert counters with his Waldgeist");
    trade_service
        .respond_to_trade_request(&trade_id, bert, vec![card("b1", "Waldgeist", "🌲", Rarity::Rare)])
        .await?;

    info!("alice accepts the counter-offer");
    trade_service
        .finalize_trade_request(&trade_id, alice, true)
        .await?;
    tokio::time::sleep(settle).await;

    let alice_save = player_repo
        .get_save(alice)
        .await?
        .ok_or_else(|| anyhow::anyhow!("alice's save vanished"))?;
    let bert_save = player_repo
        .get_save(bert)
        .await?
        .ok_or_else(|| anyhow::anyhow!("bert's save vanished"))?;
    info!(
        "alice now holds: {:?}",
        alice_save.collection.iter().map(|c| &c.name).collect::<Vec<_>>()
    );
    info!(
        "bert now holds: {:?}",
        bert_save.collection.iter().map(|c| &c.name).collect::<Vec<_>>()
    );

    friendship_service.unsubscribe_all().await;
    trade_service.unsubscribe_all().await;
    hub.unregister(alice);
    hub.unregister(bert);
    let _ = printer.await;

    Ok(())
}
