use crate::application_impl::SeenTracker;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct RealFriendshipService {
    friendship_repo: Arc<dyn FriendshipRepo>,
    player_repo: Arc<dyn PlayerRepo>,
    dispatch: Arc<dyn NotificationDispatch>,
    seen_requests: Arc<SeenTracker>,
    seen_friendships: Arc<SeenTracker>,
    listeners: DashMap<String, Subscription>,
}

fn friends_key(user: UserId) -> String {
    format!("friends:{user}")
}

fn requests_key(user: UserId) -> String {
    format!("friend-requests:{user}")
}

impl RealFriendshipService {
    pub fn new(
        friendship_repo: Arc<dyn FriendshipRepo>,
        player_repo: Arc<dyn PlayerRepo>,
        dispatch: Arc<dyn NotificationDispatch>,
        seen_requests: Arc<SeenTracker>,
        seen_friendships: Arc<SeenTracker>,
    ) -> Self {
        Self {
            friendship_repo,
            player_repo,
            dispatch,
            seen_requests,
            seen_friendships,
            listeners: DashMap::new(),
        }
    }

    async fn load_profile(&self, user: UserId) -> Result<UserProfile, FriendError> {
        self.player_repo
            .get_profile(user)
            .await?
            .ok_or(FriendError::UserNotFound)
    }

    async fn remove_listener(&self, key: &str) {
        if let Some((_, old)) = self.listeners.remove(key) {
            old.shutdown().await;
        }
    }
}

/// Counterpart nickname and friend code, tolerating a missing profile the
/// way the live views do: the relationship still renders, the name is a
/// placeholder.
async fn counterpart_identity(
    player_repo: &Arc<dyn PlayerRepo>,
    user: UserId,
) -> Result<(String, String), StoreError> {
    match player_repo.get_profile(user).await? {
        Some(profile) => Ok((profile.nickname, profile.friend_code)),
        None => {
            tracing::warn!("profile missing for user {user}");
            Ok(("Unknown".to_owned(), String::new()))
        }
    }
}

async fn build_friend_views(
    player_repo: &Arc<dyn PlayerRepo>,
    me: UserId,
    friendships: &[Friendship],
) -> Result<Vec<Friend>, StoreError> {
    let others: Vec<UserId> = friendships.iter().filter_map(|f| f.other_of(me)).collect();
    let presence = player_repo.get_presence(&others).await?;

    let mut views = Vec::with_capacity(friendships.len());
    for friendship in friendships {
        let Some(other) = friendship.other_of(me) else {
            continue;
        };
        let (nickname, friend_code) = counterpart_identity(player_repo, other).await?;
        let seen = presence.get(&other).copied().unwrap_or_default();
        if let Some(view) = Friend::from_friendship(me, friendship, nickname, friend_code, seen) {
            views.push(view);
        }
    }
    Ok(views)
}

async fn build_request_views(
    player_repo: &Arc<dyn PlayerRepo>,
    me: UserId,
    friendships: &[Friendship],
) -> Result<Vec<PendingRequest>, StoreError> {
    let mut views = Vec::with_capacity(friendships.len());
    for friendship in friendships {
        let Some(other) = friendship.other_of(me) else {
            continue;
        };
        let (nickname, _) = counterpart_identity(player_repo, other).await?;
        views.push(PendingRequest {
            friendship_id: friendship.id.clone(),
            counterpart: other,
            counterpart_nickname: nickname,
            incoming: friendship.initiated_by != me,
            created_at: friendship.created_at,
        });
    }
    Ok(views)
}

#[async_trait::async_trait]
impl FriendshipService for RealFriendshipService {
    async fn send_request(&self, from: UserId, to: UserId) -> Result<FriendshipId, FriendError> {
        if from == to {
            return Err(FriendError::SelfRequest);
        }
        // both accounts must exist before a relationship can reference them
        self.load_profile(from).await?;
        self.load_profile(to).await?;

        let id = FriendshipId::for_pair(from, to);
        if let Some(existing) = self.friendship_repo.get(&id).await? {
            return Err(match existing.status {
                FriendshipStatus::Accepted => FriendError::AlreadyFriends,
                FriendshipStatus::Pending => FriendError::RequestPending,
                FriendshipStatus::Blocked => FriendError::Blocked,
            });
        }

        let friendship = Friendship::new_pending(from, to, Utc::now());
        self.friendship_repo.put(&friendship).await?;
        tracing::debug!("friend request {} -> {} created", from, to);

        // The receiver is informed reactively through their own
        // subscription; no command-side dispatch here.
        Ok(id)
    }

    async fn accept_request(&self, id: &FriendshipId) -> Result<(), FriendError> {
        let mut friendship = self
            .friendship_repo
            .get(id)
            .await?
            .ok_or(FriendError::NotFound)?;

        let now = Utc::now();
        friendship.status = FriendshipStatus::Accepted;
        friendship.accepted_at = Some(now);
        friendship.last_activity = now;
        self.friendship_repo.put(&friendship).await?;
        Ok(())
    }

    async fn decline_request(
        &self,
        id: &FriendshipId,
        declined_by: Option<UserId>,
    ) -> Result<(), FriendError> {
        let friendship = self
            .friendship_repo
            .get(id)
            .await?
            .ok_or(FriendError::NotFound)?;

        if let Some(decliner) = declined_by {
            if decliner != friendship.initiated_by {
                match self.player_repo.get_profile(decliner).await {
                    Ok(Some(profile)) => {
                        let note = Notification::new(
                            NotificationKind::RequestDeclined,
                            profile.nickname,
                        );
                        if let Err(e) =
                            self.dispatch.notify(friendship.initiated_by, note).await
                        {
                            // deletion proceeds even when dispatch fails
                            tracing::warn!("decline notification failed: {e:#}");
                        }
                    }
                    Ok(None) => tracing::warn!("decliner profile missing for {decliner}"),
                    Err(e) => tracing::warn!("decliner profile lookup failed: {e}"),
                }
            }
        }

        self.friendship_repo.delete(id).await?;
        Ok(())
    }

    async fn remove_friend(&self, id: &FriendshipId, block: bool) -> Result<(), FriendError> {
        let mut friendship = self
            .friendship_repo
            .get(id)
            .await?
            .ok_or(FriendError::NotFound)?;

        if block {
            friendship.status = FriendshipStatus::Blocked;
            friendship.last_activity = Utc::now();
            self.friendship_repo.put(&friendship).await?;
        } else {
            self.friendship_repo.delete(id).await?;
        }
        Ok(())
    }

    async fn update_consent(
        &self,
        id: &FriendshipId,
        acting_user: UserId,
        update: ConsentUpdate,
    ) -> Result<(), FriendError> {
        let mut friendship = self
            .friendship_repo
            .get(id)
            .await?
            .ok_or(FriendError::NotFound)?;

        if !friendship.is_participant(acting_user) {
            return Err(FriendError::NotParticipant);
        }

        if let Some(can_trade) = update.can_trade {
            friendship.set_trade_consent(acting_user, can_trade);
        }
        if let Some(can_chat) = update.can_chat {
            friendship.can_chat = can_chat;
        }
        friendship.last_activity = Utc::now();
        self.friendship_repo.put(&friendship).await?;
        Ok(())
    }

    async fn can_users_trade(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<TradeEligibility, FriendError> {
        let profile_a = self.load_profile(a).await?;
        if !profile_a.trading_enabled {
            return Ok(TradeEligibility::Denied(TradeDenial::GloballyDisabled(a)));
        }
        let profile_b = self.load_profile(b).await?;
        if !profile_b.trading_enabled {
            return Ok(TradeEligibility::Denied(TradeDenial::GloballyDisabled(b)));
        }

        let id = FriendshipId::for_pair(a, b);
        let friendship = match self.friendship_repo.get(&id).await? {
            Some(f) => f,
            None => return Ok(TradeEligibility::Denied(TradeDenial::NotFriends)),
        };
        match friendship.status {
            FriendshipStatus::Blocked => {
                return Ok(TradeEligibility::Denied(TradeDenial::Blocked));
            }
            FriendshipStatus::Pending => {
                return Ok(TradeEligibility::Denied(TradeDenial::NotFriends));
            }
            FriendshipStatus::Accepted => {}
        }

        if !friendship.consents_to_trade(a) {
            return Ok(TradeEligibility::Denied(TradeDenial::OptedOut(a)));
        }
        if !friendship.consents_to_trade(b) {
            return Ok(TradeEligibility::Denied(TradeDenial::OptedOut(b)));
        }
        Ok(TradeEligibility::Allowed)
    }

    async fn get_friendship(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<Friendship>, FriendError> {
        Ok(self
            .friendship_repo
            .get(&FriendshipId::for_pair(a, b))
            .await?)
    }

    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, FriendError> {
        Ok(self
            .get_friendship(a, b)
            .await?
            .is_some_and(|f| f.status == FriendshipStatus::Accepted))
    }

    async fn get_friends(&self, user: UserId) -> Result<Vec<Friend>, FriendError> {
        let friendships = self
            .friendship_repo
            .list_for_user(user, FriendshipStatus::Accepted)
            .await?;
        Ok(build_friend_views(&self.player_repo, user, &friendships).await?)
    }

    async fn get_friend_requests(
        &self,
        user: UserId,
    ) -> Result<Vec<PendingRequest>, FriendError> {
        let friendships = self
            .friendship_repo
            .list_for_user(user, FriendshipStatus::Pending)
            .await?;
        Ok(build_request_views(&self.player_repo, user, &friendships).await?)
    }

    async fn friendship_stats(&self, user: UserId) -> Result<FriendshipStats, FriendError> {
        let friends = self.get_friends(user).await?;
        let requests = self.get_friend_requests(user).await?;
        let pending_requests = requests.iter().filter(|r| r.incoming).count();
        Ok(FriendshipStats {
            total_friends: friends.len(),
            pending_requests,
            sent_requests: requests.len() - pending_requests,
        })
    }

    async fn subscribe_friends(
        &self,
        user: UserId,
        snapshots: mpsc::Sender<Vec<Friend>>,
    ) -> Result<(), FriendError> {
        let key = friends_key(user);
        self.remove_listener(&key).await;

        let (tx, mut rx) = mpsc::channel::<Vec<Friendship>>(16);
        let subscription = self
            .friendship_repo
            .subscribe_for_user(user, FriendshipStatus::Accepted, tx)
            .await?;

        let token = subscription.token();
        let player_repo = self.player_repo.clone();
        let dispatch = self.dispatch.clone();
        let seen = self.seen_friendships.clone();
        let mapper = tokio::spawn(async move {
            loop {
                let batch = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    batch = rx.recv() => match batch {
                        Some(batch) => batch,
                        None => break,
                    },
                };

                let views = match build_friend_views(&player_repo, user, &batch).await {
                    Ok(views) => views,
                    Err(e) => {
                        tracing::error!("friends snapshot mapping failed: {e}");
                        continue;
                    }
                };

                for view in &views {
                    if seen.contains(&view.friendship_id.0) {
                        continue;
                    }
                    // A freshly visible accepted friendship: either our own
                    // request went through, or we were added.
                    let accepted_our_request = batch
                        .iter()
                        .find(|f| f.id == view.friendship_id)
                        .is_some_and(|f| f.initiated_by == user);
                    let kind = if accepted_our_request {
                        NotificationKind::RequestAccepted
                    } else {
                        NotificationKind::FriendAdded
                    };
                    let note = Notification::new(kind, view.nickname.clone());
                    if let Err(e) = dispatch.notify(user, note).await {
                        tracing::warn!("friendship notification failed: {e:#}");
                    }
                    seen.mark(&view.friendship_id.0).await;
                }

                if snapshots.send(views).await.is_err() {
                    break;
                }
            }
        });
        subscription.attach(mapper);
        self.listeners.insert(key, subscription);
        Ok(())
    }

    async fn subscribe_friend_requests(
        &self,
        user: UserId,
        snapshots: mpsc::Sender<Vec<PendingRequest>>,
    ) -> Result<(), FriendError> {
        let key = requests_key(user);
        self.remove_listener(&key).await;

        let (tx, mut rx) = mpsc::channel::<Vec<Friendship>>(16);
        let subscription = self
            .friendship_repo
            .subscribe_for_user(user, FriendshipStatus::Pending, tx)
            .await?;

        let token = subscription.token();
        let player_repo = self.player_repo.clone();
        let dispatch = self.dispatch.clone();
        let seen = self.seen_requests.clone();
        let mapper = tokio::spawn(async move {
            loop {
                let batch = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    batch = rx.recv() => match batch {
                        Some(batch) => batch,
                        None => break,
                    },
                };

                let views = match build_request_views(&player_repo, user, &batch).await {
                    Ok(views) => views,
                    Err(e) => {
                        tracing::error!("friend-request snapshot mapping failed: {e}");
                        continue;
                    }
                };

                for view in &views {
                    if seen.contains(&view.friendship_id.0) {
                        continue;
                    }
                    // our own outgoing requests are recorded but never
                    // announced to ourselves
                    if view.incoming {
                        let note = Notification::new(
                            NotificationKind::FriendRequest,
                            view.counterpart_nickname.clone(),
                        );
                        if let Err(e) = dispatch.notify(user, note).await {
                            tracing::warn!("friend-request notification failed: {e:#}");
                        }
                    }
                    seen.mark(&view.friendship_id.0).await;
                }

                if snapshots.send(views).await.is_err() {
                    break;
                }
            }
        });
        subscription.attach(mapper);
        self.listeners.insert(key, subscription);
        Ok(())
    }

    async fn mark_all_requests_seen(&self, user: UserId) -> Result<(), FriendError> {
        let requests = self.get_friend_requests(user).await?;
        self.seen_requests
            .mark_many(requests.into_iter().map(|r| r.friendship_id.0))
            .await;
        Ok(())
    }

    async fn unsubscribe_friends(&self, user: UserId) {
        self.remove_listener(&friends_key(user)).await;
    }

    async fn unsubscribe_friend_requests(&self, user: UserId) {
        self.remove_listener(&requests_key(user)).await;
    }

    async fn unsubscribe_all(&self) {
        let keys: Vec<String> = self.listeners.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            self.remove_listener(&key).await;
        }
    }
}
