mod common;

use common::*;
use tradepost::application_port::{ConsentUpdate, FriendError};
use tradepost::domain_model::*;

#[tokio::test]
async fn request_then_accept_establishes_friendship() {
    let h = harness().await;
    let (alice, bert) = (uid(1), uid(2));
    seed_player(&h, alice, "alice", vec![]);
    seed_player(&h, bert, "bert", vec![]);

    let id = h.friendships.send_request(alice, bert).await.unwrap();
    assert!(!h.friendships.are_friends(alice, bert).await.unwrap());

    let bert_requests = h.friendships.get_friend_requests(bert).await.unwrap();
    assert_eq!(bert_requests.len(), 1);
    assert!(bert_requests[0].incoming);
    assert_eq!(bert_requests[0].counterpart_nickname, "alice");

    let alice_requests = h.friendships.get_friend_requests(alice).await.unwrap();
    assert_eq!(alice_requests.len(), 1);
    assert!(!alice_requests[0].incoming);

    h.friendships.accept_request(&id).await.unwrap();
    assert!(h.friendships.are_friends(alice, bert).await.unwrap());
    assert!(h.friendships.are_friends(bert, alice).await.unwrap());

    let friendship = h
        .friendships
        .get_friendship(bert, alice)
        .await
        .unwrap()
        .unwrap();
    assert!(friendship.accepted_at.is_some());
}

#[tokio::test]
async fn self_request_is_rejected() {
    let h = harness().await;
    let alice = uid(1);
    seed_player(&h, alice, "alice", vec![]);

    let err = h.friendships.send_request(alice, alice).await.unwrap_err();
    assert!(matches!(err, FriendError::SelfRequest));
}

#[tokio::test]
async fn request_to_unknown_user_is_rejected() {
    let h = harness().await;
    let alice = uid(1);
    seed_player(&h, alice, "alice", vec![]);

    let err = h.friendships.send_request(alice, uid(99)).await.unwrap_err();
    assert!(matches!(err, FriendError::UserNotFound));
}

#[tokio::test]
async fn duplicate_requests_map_to_existing_status() {
    let h = harness().await;
    let (alice, bert) = (uid(1), uid(2));
    seed_player(&h, alice, "alice", vec![]);
    seed_player(&h, bert, "bert", vec![]);

    let id = h.friendships.send_request(alice, bert).await.unwrap();
    // a second request in either direction hits the same sorted-pair key
    assert!(matches!(
        h.friendships.send_request(alice, bert).await.unwrap_err(),
        FriendError::RequestPending
    ));
    assert!(matches!(
        h.friendships.send_request(bert, alice).await.unwrap_err(),
        FriendError::RequestPending
    ));

    h.friendships.accept_request(&id).await.unwrap();
    assert!(matches!(
        h.friendships.send_request(bert, alice).await.unwrap_err(),
        FriendError::AlreadyFriends
    ));

    h.friendships.remove_friend(&id, true).await.unwrap();
    assert!(matches!(
        h.friendships.send_request(alice, bert).await.unwrap_err(),
        FriendError::Blocked
    ));
}

#[tokio::test]
async fn declining_incoming_request_notifies_initiator() {
    let h = harness().await;
    let (alice, bert) = (uid(1), uid(2));
    seed_player(&h, alice, "alice", vec![]);
    seed_player(&h, bert, "bert", vec![]);

    let id = h.friendships.send_request(alice, bert).await.unwrap();
    h.friendships
        .decline_request(&id, Some(bert))
        .await
        .unwrap();

    let to_alice = h.dispatch.sent_to(alice);
    assert_eq!(to_alice.len(), 1);
    assert_eq!(to_alice[0].kind, NotificationKind::RequestDeclined);
    assert_eq!(to_alice[0].actor_nickname, "bert");
    assert!(h
        .friendships
        .get_friendship(alice, bert)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn withdrawing_own_request_notifies_nobody() {
    let h = harness().await;
    let (alice, bert) = (uid(1), uid(2));
    seed_player(&h, alice, "alice", vec![]);
    seed_player(&h, bert, "bert", vec![]);

    let id = h.friendships.send_request(alice, bert).await.unwrap();
    h.friendships
        .decline_request(&id, Some(alice))
        .await
        .unwrap();

    assert!(h.dispatch.sent().is_empty());
}

#[tokio::test]
async fn removing_a_friend_allows_a_fresh_request() {
    let h = harness().await;
    let (alice, bert) = (uid(1), uid(2));
    seed_player(&h, alice, "alice", vec![]);
    seed_player(&h, bert, "bert", vec![]);

    let id = befriend(&h, alice, bert).await;
    h.friendships.remove_friend(&id, false).await.unwrap();
    assert!(!h.friendships.are_friends(alice, bert).await.unwrap());

    // pair key is free again
    h.friendships.send_request(bert, alice).await.unwrap();
}

#[tokio::test]
async fn blocking_keeps_the_record() {
    let h = harness().await;
    let (alice, bert) = (uid(1), uid(2));
    seed_player(&h, alice, "alice", vec![]);
    seed_player(&h, bert, "bert", vec![]);

    let id = befriend(&h, alice, bert).await;
    h.friendships.remove_friend(&id, true).await.unwrap();

    let friendship = h
        .friendships
        .get_friendship(alice, bert)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(friendship.status, FriendshipStatus::Blocked);
    assert_eq!(
        h.friendships.can_users_trade(alice, bert).await.unwrap(),
        TradeEligibility::Denied(TradeDenial::Blocked)
    );
}

#[tokio::test]
async fn consent_gates_trading_per_slot() {
    let h = harness().await;
    let (alice, bert) = (uid(1), uid(2));
    seed_player(&h, alice, "alice", vec![]);
    seed_player(&h, bert, "bert", vec![]);

    let id = befriend(&h, alice, bert).await;
    assert_eq!(
        h.friendships.can_users_trade(alice, bert).await.unwrap(),
        TradeEligibility::Allowed
    );

    h.friendships
        .update_consent(
            &id,
            bert,
            ConsentUpdate {
                can_trade: Some(false),
                can_chat: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(
        h.friendships.can_users_trade(alice, bert).await.unwrap(),
        TradeEligibility::Denied(TradeDenial::OptedOut(bert))
    );

    // alice's own slot is untouched
    let friendship = h
        .friendships
        .get_friendship(alice, bert)
        .await
        .unwrap()
        .unwrap();
    assert!(friendship.consents_to_trade(alice));
    assert!(!friendship.consents_to_trade(bert));
}

#[tokio::test]
async fn stranger_cannot_update_consent() {
    let h = harness().await;
    let (alice, bert, mallory) = (uid(1), uid(2), uid(3));
    seed_player(&h, alice, "alice", vec![]);
    seed_player(&h, bert, "bert", vec![]);
    seed_player(&h, mallory, "mallory", vec![]);

    let id = befriend(&h, alice, bert).await;
    let err = h
        .friendships
        .update_consent(
            &id,
            mallory,
            ConsentUpdate {
                can_trade: Some(false),
                can_chat: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FriendError::NotParticipant));
}

#[tokio::test]
async fn global_toggle_overrides_friendship_consent() {
    let h = harness().await;
    let (alice, bert) = (uid(1), uid(2));
    seed_player(&h, alice, "alice", vec![]);
    seed_player(&h, bert, "bert", vec![]);
    befriend(&h, alice, bert).await;

    disable_trading_globally(&h, bert);
    assert_eq!(
        h.friendships.can_users_trade(alice, bert).await.unwrap(),
        TradeEligibility::Denied(TradeDenial::GloballyDisabled(bert))
    );
}

#[tokio::test]
async fn non_friends_cannot_trade() {
    let h = harness().await;
    let (alice, bert) = (uid(1), uid(2));
    seed_player(&h, alice, "alice", vec![]);
    seed_player(&h, bert, "bert", vec![]);

    assert_eq!(
        h.friendships.can_users_trade(alice, bert).await.unwrap(),
        TradeEligibility::Denied(TradeDenial::NotFriends)
    );

    // pending is not enough either
    h.friendships.send_request(alice, bert).await.unwrap();
    assert_eq!(
        h.friendships.can_users_trade(alice, bert).await.unwrap(),
        TradeEligibility::Denied(TradeDenial::NotFriends)
    );
}

#[tokio::test]
async fn stats_split_incoming_and_outgoing() {
    let h = harness().await;
    let (alice, bert, carol, dave) = (uid(1), uid(2), uid(3), uid(4));
    seed_player(&h, alice, "alice", vec![]);
    seed_player(&h, bert, "bert", vec![]);
    seed_player(&h, carol, "carol", vec![]);
    seed_player(&h, dave, "dave", vec![]);

    befriend(&h, alice, bert).await;
    h.friendships.send_request(carol, alice).await.unwrap();
    h.friendships.send_request(alice, dave).await.unwrap();

    let stats = h.friendships.friendship_stats(alice).await.unwrap();
    assert_eq!(stats.total_friends, 1);
    assert_eq!(stats.pending_requests, 1);
    assert_eq!(stats.sent_requests, 1);
}

#[tokio::test]
async fn friend_view_carries_counterpart_data() {
    let h = harness().await;
    let (alice, bert) = (uid(1), uid(2));
    seed_player(&h, alice, "alice", vec![]);
    seed_player(&h, bert, "bert", vec![]);
    h.store.set_presence(
        bert,
        Presence {
            is_online: true,
            last_seen: Some(chrono::Utc::now()),
        },
    );
    befriend(&h, alice, bert).await;

    let friends = h.friendships.get_friends(alice).await.unwrap();
    assert_eq!(friends.len(), 1);
    let friend = &friends[0];
    assert_eq!(friend.user_id, bert);
    assert_eq!(friend.nickname, "bert");
    assert_eq!(friend.friend_code, "BERT-CODE");
    assert!(friend.is_online);
    assert!(friend.i_allow_trading);
    assert!(friend.friend_allows_trading);
}
