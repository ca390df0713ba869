use crate::application_impl::SeenTracker;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct RealTradeService {
    trade_repo: Arc<dyn TradeRepo>,
    player_repo: Arc<dyn PlayerRepo>,
    friendship_service: Arc<dyn FriendshipService>,
    dispatch: Arc<dyn NotificationDispatch>,
    seen_trades: Arc<SeenTracker>,
    listeners: DashMap<String, Subscription>,
}

fn trades_key(user: UserId) -> String {
    format!("trades:{user}")
}

fn eligibility_error(e: FriendError) -> TradeError {
    match e {
        FriendError::UserNotFound => TradeError::UserNotFound,
        other => TradeError::Store(other.to_string()),
    }
}

impl RealTradeService {
    pub fn new(
        trade_repo: Arc<dyn TradeRepo>,
        player_repo: Arc<dyn PlayerRepo>,
        friendship_service: Arc<dyn FriendshipService>,
        dispatch: Arc<dyn NotificationDispatch>,
        seen_trades: Arc<SeenTracker>,
    ) -> Self {
        Self {
            trade_repo,
            player_repo,
            friendship_service,
            dispatch,
            seen_trades,
            listeners: DashMap::new(),
        }
    }

    async fn load_profile(&self, user: UserId) -> Result<UserProfile, TradeError> {
        self.player_repo
            .get_profile(user)
            .await?
            .ok_or(TradeError::UserNotFound)
    }

    async fn load_save(&self, user: UserId) -> Result<PlayerSave, TradeError> {
        self.player_repo
            .get_save(user)
            .await?
            .ok_or(TradeError::UserNotFound)
    }

    async fn load_trade(&self, id: &TradeId) -> Result<TradeRequest, TradeError> {
        self.trade_repo.get(id).await?.ok_or(TradeError::NotFound)
    }

    /// Checks `user`'s live collection against a committed card set.
    async fn verify_ownership(
        &self,
        user: UserId,
        cards: &[Card],
        side: TradeSide,
    ) -> Result<PlayerSave, TradeError> {
        let save = self.load_save(user).await?;
        if !owns_all(&save.collection, cards) {
            return Err(TradeError::OwnershipViolation(side));
        }
        Ok(save)
    }

    async fn notify_best_effort(&self, target: UserId, note: Notification) {
        if let Err(e) = self.dispatch.notify(target, note).await {
            tracing::warn!("trade notification to {target} failed: {e:#}");
        }
    }

    /// Compensation for a claimed accept that could not be carried out:
    /// hands the trade back to `responded` so the initiator may retry.
    async fn reopen(&self, id: &TradeId) {
        let transition = TradeTransition::Reopen { at: Utc::now() };
        match self
            .trade_repo
            .apply_transition(id, &[TradeStatus::Accepted], transition)
            .await
        {
            Ok(TransitionOutcome::Applied(_)) => {}
            Ok(other) => tracing::error!("reopening trade {id} found unexpected state: {other:?}"),
            Err(e) => tracing::error!("failed to reopen trade {id}: {e}"),
        }
    }

    /// The one place two users' collections are mutated together. Ownership
    /// is re-checked against the current persisted collections first; the
    /// two save writes are not transactional, so a failure of the second
    /// write is escalated as `ExchangeInconsistent` for out-of-band
    /// reconciliation.
    async fn execute_exchange(&self, trade: &TradeRequest) -> Result<(), TradeError> {
        let requested = match &trade.requested_cards {
            Some(cards) if !cards.is_empty() => cards,
            _ => return Err(TradeError::EmptySelection),
        };

        let initiator = trade.initiator.user_id;
        let receiver = trade.receiver.user_id;
        let offered: Vec<Card> = trade.offered_cards.iter().map(TradedCard::to_card).collect();
        let requested: Vec<Card> = requested.iter().map(TradedCard::to_card).collect();

        let mut initiator_save = self
            .verify_ownership(initiator, &offered, TradeSide::Initiator)
            .await?;
        let mut receiver_save = self
            .verify_ownership(receiver, &requested, TradeSide::Receiver)
            .await?;

        let now = Utc::now();
        remove_cards(&mut initiator_save.collection, &offered);
        initiator_save.collection.extend(requested.iter().cloned());
        initiator_save.last_saved = now;

        remove_cards(&mut receiver_save.collection, &requested);
        receiver_save.collection.extend(offered.iter().cloned());
        receiver_save.last_saved = now;

        self.player_repo
            .put_save(initiator, &initiator_save)
            .await?;
        if let Err(e) = self.player_repo.put_save(receiver, &receiver_save).await {
            // First write already landed. Collections are now out of sync
            // and must be reconciled manually; no automatic rollback.
            tracing::error!(
                trade = %trade.id,
                initiator = %initiator,
                receiver = %receiver,
                "second exchange write failed after first succeeded: {e}"
            );
            return Err(TradeError::ExchangeInconsistent(format!(
                "receiver collection write failed for trade {}: {e}",
                trade.id
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TradeService for RealTradeService {
    async fn create_trade_request(
        &self,
        initiator: UserId,
        receiver: UserId,
        offered_cards: Vec<Card>,
    ) -> Result<TradeId, TradeError> {
        if offered_cards.is_empty() {
            return Err(TradeError::EmptyOffer);
        }

        match self
            .friendship_service
            .can_users_trade(initiator, receiver)
            .await
            .map_err(eligibility_error)?
        {
            TradeEligibility::Allowed => {}
            TradeEligibility::Denied(reason) => return Err(TradeError::NotAllowed(reason)),
        }

        if self
            .trade_repo
            .find_active_between(initiator, receiver)
            .await?
            .is_some()
        {
            return Err(TradeError::DuplicateRequest);
        }

        self.verify_ownership(initiator, &offered_cards, TradeSide::Initiator)
            .await?;

        let initiator_profile = self.load_profile(initiator).await?;
        let receiver_profile = self.load_profile(receiver).await?;

        let trade = TradeRequest::new_pending(
            TradeParty {
                user_id: initiator,
                nickname: initiator_profile.nickname.clone(),
            },
            TradeParty {
                user_id: receiver,
                nickname: receiver_profile.nickname,
            },
            offered_cards.iter().map(TradedCard::from_card).collect(),
            Utc::now(),
        );
        self.trade_repo.put(&trade).await?;
        tracing::debug!("trade {} created: {} -> {}", trade.id, initiator, receiver);

        self.notify_best_effort(
            receiver,
            Notification::new(NotificationKind::TradeRequest, initiator_profile.nickname)
                .with_card_count(offered_cards.len()),
        )
        .await;

        Ok(trade.id)
    }

    async fn respond_to_trade_request(
        &self,
        trade_id: &TradeId,
        responder: UserId,
        requested_cards: Vec<Card>,
    ) -> Result<(), TradeError> {
        let trade = self.load_trade(trade_id).await?;

        if trade.receiver.user_id != responder {
            return Err(TradeError::NotAuthorized(TradeSide::Receiver));
        }
        if requested_cards.is_empty() {
            return Err(TradeError::EmptySelection);
        }
        self.verify_ownership(responder, &requested_cards, TradeSide::Receiver)
            .await?;

        let transition = TradeTransition::Respond {
            requested_cards: requested_cards.iter().map(TradedCard::from_card).collect(),
            at: Utc::now(),
        };
        let updated = match self
            .trade_repo
            .apply_transition(trade_id, &[TradeStatus::Pending], transition)
            .await?
        {
            TransitionOutcome::Applied(updated) => updated,
            TransitionOutcome::StatusMismatch(actual) => {
                return Err(TradeError::InvalidState {
                    expected: "pending",
                    actual,
                });
            }
            TransitionOutcome::Missing => return Err(TradeError::NotFound),
        };

        self.notify_best_effort(
            updated.initiator.user_id,
            Notification::new(NotificationKind::TradeResponse, updated.receiver.nickname)
                .with_card_count(requested_cards.len()),
        )
        .await;
        Ok(())
    }

    async fn finalize_trade_request(
        &self,
        trade_id: &TradeId,
        finalizer: UserId,
        accept: bool,
    ) -> Result<(), TradeError> {
        let trade = self.load_trade(trade_id).await?;

        if trade.initiator.user_id != finalizer {
            return Err(TradeError::NotAuthorized(TradeSide::Initiator));
        }

        if !accept {
            let transition = TradeTransition::Decline {
                by: TradeSide::Initiator,
                at: Utc::now(),
            };
            return match self
                .trade_repo
                .apply_transition(trade_id, &[TradeStatus::Responded], transition)
                .await?
            {
                TransitionOutcome::Applied(updated) => {
                    self.notify_best_effort(
                        updated.receiver.user_id,
                        Notification::new(
                            NotificationKind::TradeDeclined,
                            updated.initiator.nickname,
                        ),
                    )
                    .await;
                    Ok(())
                }
                TransitionOutcome::StatusMismatch(actual) => Err(TradeError::InvalidState {
                    expected: "responded",
                    actual,
                }),
                TransitionOutcome::Missing => Err(TradeError::NotFound),
            };
        }

        // Claim the accept first: the status re-read and the transition
        // land in one write, so of two racing finalizers exactly one gets
        // to run the exchange. The loser sees InvalidState.
        let transition = TradeTransition::Accept { at: Utc::now() };
        let claimed = match self
            .trade_repo
            .apply_transition(trade_id, &[TradeStatus::Responded], transition)
            .await?
        {
            TransitionOutcome::Applied(updated) => updated,
            TransitionOutcome::StatusMismatch(actual) => {
                return Err(TradeError::InvalidState {
                    expected: "responded",
                    actual,
                });
            }
            TransitionOutcome::Missing => return Err(TradeError::NotFound),
        };

        // Consent is re-checked live, not cached from creation time: a
        // revoked flag, a global opt-out or a block between counter and
        // accept hands the trade back instead of executing.
        let eligibility = self
            .friendship_service
            .can_users_trade(claimed.initiator.user_id, claimed.receiver.user_id)
            .await
            .map_err(eligibility_error);
        match eligibility {
            Ok(TradeEligibility::Allowed) => {}
            Ok(TradeEligibility::Denied(reason)) => {
                self.reopen(trade_id).await;
                return Err(TradeError::NotAllowed(reason));
            }
            Err(e) => {
                self.reopen(trade_id).await;
                return Err(e);
            }
        }

        if let Err(e) = self.execute_exchange(&claimed).await {
            // A half-landed exchange keeps the accepted status and is
            // surfaced as fatal; any other failure happened before the
            // second write, so the trade is handed back for a retry.
            if !matches!(e, TradeError::ExchangeInconsistent(_)) {
                self.reopen(trade_id).await;
            }
            return Err(e);
        }

        let traded_away_by_receiver = claimed
            .requested_cards
            .as_ref()
            .map(Vec::len)
            .unwrap_or_default();
        self.notify_best_effort(
            claimed.receiver.user_id,
            Notification::new(NotificationKind::TradeAccepted, claimed.initiator.nickname)
                .with_card_count(traded_away_by_receiver),
        )
        .await;
        self.notify_best_effort(
            claimed.initiator.user_id,
            Notification::new(NotificationKind::TradeAccepted, claimed.receiver.nickname)
                .with_card_count(claimed.offered_cards.len()),
        )
        .await;
        Ok(())
    }

    async fn cancel_trade_request(
        &self,
        trade_id: &TradeId,
        canceller: UserId,
    ) -> Result<(), TradeError> {
        let trade = self.load_trade(trade_id).await?;
        if trade.initiator.user_id != canceller {
            return Err(TradeError::NotAuthorized(TradeSide::Initiator));
        }

        let transition = TradeTransition::Cancel { at: Utc::now() };
        match self
            .trade_repo
            .apply_transition(
                trade_id,
                &[TradeStatus::Pending, TradeStatus::Responded],
                transition,
            )
            .await?
        {
            // Withdrawing your own proposal does not alert the other side.
            TransitionOutcome::Applied(_) => Ok(()),
            TransitionOutcome::StatusMismatch(actual) => Err(TradeError::InvalidState {
                expected: "pending or responded",
                actual,
            }),
            TransitionOutcome::Missing => Err(TradeError::NotFound),
        }
    }

    async fn decline_trade_request(
        &self,
        trade_id: &TradeId,
        decliner: UserId,
    ) -> Result<(), TradeError> {
        let trade = self.load_trade(trade_id).await?;
        if trade.receiver.user_id != decliner {
            return Err(TradeError::NotAuthorized(TradeSide::Receiver));
        }

        let transition = TradeTransition::Decline {
            by: TradeSide::Receiver,
            at: Utc::now(),
        };
        match self
            .trade_repo
            .apply_transition(trade_id, &[TradeStatus::Pending], transition)
            .await?
        {
            TransitionOutcome::Applied(updated) => {
                self.notify_best_effort(
                    updated.initiator.user_id,
                    Notification::new(NotificationKind::TradeDeclined, updated.receiver.nickname),
                )
                .await;
                Ok(())
            }
            TransitionOutcome::StatusMismatch(actual) => Err(TradeError::InvalidState {
                expected: "pending",
                actual,
            }),
            TransitionOutcome::Missing => Err(TradeError::NotFound),
        }
    }

    async fn get_trade_requests(&self, user: UserId) -> Result<Vec<TradeRequest>, TradeError> {
        Ok(self.trade_repo.list_active_for_user(user).await?)
    }

    async fn mark_trade_seen(
        &self,
        trade_id: &TradeId,
        user: UserId,
    ) -> Result<(), TradeError> {
        // field-level write; a whole-document put here could overwrite a
        // transition that raced past our read
        if !self.trade_repo.mark_seen(trade_id, user).await? {
            return Err(TradeError::NotFound);
        }
        Ok(())
    }

    async fn subscribe_trade_requests(
        &self,
        user: UserId,
        snapshots: mpsc::Sender<Vec<TradeRequest>>,
    ) -> Result<(), TradeError> {
        let key = trades_key(user);
        if let Some((_, old)) = self.listeners.remove(&key) {
            old.shutdown().await;
        }

        let (tx, mut rx) = mpsc::channel::<Vec<TradeRequest>>(16);
        let subscription = self.trade_repo.subscribe_active_for_user(user, tx).await?;

        let token = subscription.token();
        let seen = self.seen_trades.clone();
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

                // Trade events are announced by the command side through
                // the dispatcher; here we only record what this device has
                // now displayed, so a reconnect stays silent.
                let unseen: Vec<String> = batch
                    .iter()
                    .map(|t| t.id.to_string())
                    .filter(|id| !seen.contains(id))
                    .collect();
                if !unseen.is_empty() {
                    seen.mark_many(unseen).await;
                }

                if snapshots.send(batch).await.is_err() {
                    break;
                }
            }
        });
        subscription.attach(mapper);
        self.listeners.insert(key, subscription);
        Ok(())
    }

    async fn unsubscribe_trade_requests(&self, user: UserId) {
        if let Some((_, old)) = self.listeners.remove(&trades_key(user)) {
            old.shutdown().await;
        }
    }

    async fn unsubscribe_all(&self) {
        let keys: Vec<String> = self.listeners.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((_, old)) = self.listeners.remove(&key) {
                old.shutdown().await;
            }
        }
    }
}
