use shared::referral::normalize_code;
use shared::{
    AssetCategory, ChartImage, Identity, Memory, PendingAction, PendingSlot, Profile, ReferralRegistry,
    SessionConfig, SessionStore, SignalRequest, StoreError, UserState,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::command::{
    BeginOutcome, ImageOutcome, Preferences, PreparedSignal, SessionCommand, TextOutcome,
};
use super::directory::{SessionDirectory, WeakSessionDirectory};

/// Sole owner of one user's profile and memory.
///
/// The state is loaded on the first command and cached; every mutation is
/// written through to the store before the reply is sent. After
/// `idle_timeout` without commands the actor leaves the directory and stops.
pub(crate) struct SessionActor {
    user_id: i64,
    generation: u64,
    state: Option<UserState>,
    store: Arc<dyn SessionStore>,
    registry: Arc<dyn ReferralRegistry>,
    config: Arc<SessionConfig>,
    peers: WeakSessionDirectory,
    inbox: mpsc::UnboundedReceiver<SessionCommand>,
}

impl SessionActor {
    pub(crate) fn new(
        user_id: i64,
        generation: u64,
        store: Arc<dyn SessionStore>,
        registry: Arc<dyn ReferralRegistry>,
        config: Arc<SessionConfig>,
        peers: WeakSessionDirectory,
        inbox: mpsc::UnboundedReceiver<SessionCommand>,
    ) -> Self {
        Self {
            user_id,
            generation,
            state: None,
            store,
            registry,
            config,
            peers,
            inbox,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!("Session actor for user {} started", self.user_id);
        let idle_timeout = self.config.idle_timeout;
        loop {
            match tokio::time::timeout(idle_timeout, self.inbox.recv()).await {
                Ok(Some(command)) => self.handle(command).await,
                Ok(None) => break,
                Err(_) => {
                    let Some(directory) = self.peers.upgrade() else {
                        break;
                    };
                    match directory
                        .retire(self.user_id, self.generation, &mut self.inbox)
                        .await
                    {
                        Some(command) => self.handle(command).await,
                        None => {
                            self.hand_over(&directory).await;
                            break;
                        }
                    }
                }
            }
        }
        debug!("Session actor for user {} stopped", self.user_id);
    }

    /// Pass commands queued by stale handles before the inbox closed to the
    /// user's next actor, in their original order.
    async fn hand_over(&mut self, directory: &SessionDirectory) {
        while let Some(command) = self.inbox.recv().await {
            let successor = directory.session(self.user_id).await;
            if let Err(e) = successor.send(command).await {
                warn!("Queued command for user {} dropped during hand-over: {}", self.user_id, e);
            }
        }
    }

    async fn handle(&mut self, command: SessionCommand) {
        // A dropped receiver only means the caller gave up waiting.
        match command {
            SessionCommand::Ensure {
                identity,
                referral,
                reply,
            } => {
                let _ = reply.send(self.ensure(identity, referral).await);
            }
            SessionCommand::CanConsume { reply } => {
                let _ = reply.send(self.can_consume().await);
            }
            #[cfg(test)]
            SessionCommand::Consume { reply } => {
                let _ = reply.send(self.consume().await);
            }
            SessionCommand::BeginPending {
                action,
                category,
                symbol,
                reply,
            } => {
                let _ = reply.send(self.begin_pending(action, category, symbol).await);
            }
            SessionCommand::FulfillWithImage {
                chat_id,
                image,
                reply,
            } => {
                let _ = reply.send(self.fulfill_with_image(chat_id, image).await);
            }
            SessionCommand::FulfillWithText {
                chat_id,
                text,
                reply,
            } => {
                let _ = reply.send(self.fulfill_with_text(chat_id, text).await);
            }
            SessionCommand::SelectAsset {
                category,
                symbol,
                reply,
            } => {
                let _ = reply.send(self.select_asset(category, symbol).await);
            }
            SessionCommand::SetPreferences { preferences, reply } => {
                let _ = reply.send(self.set_preferences(preferences).await);
            }
            SessionCommand::RecordNote { text, reply } => {
                let _ = reply.send(self.record_note(text).await);
            }
            SessionCommand::CreditReferral { referee } => {
                if let Err(e) = self.credit_referral(referee).await {
                    error!(
                        "Failed to credit referral from user {} to user {}: {}",
                        referee, self.user_id, e
                    );
                }
            }
            SessionCommand::AdminAddBalance { amount, reply } => {
                let _ = reply.send(self.admin_add_balance(amount).await);
            }
            SessionCommand::AdminGrantUses { uses, reply } => {
                let _ = reply.send(self.admin_grant_uses(uses).await);
            }
            SessionCommand::Snapshot { reply } => {
                let result = self.load_or_create(&Identity::bare(self.user_id)).await.map(|s| s.clone());
                let _ = reply.send(result);
            }
        }
    }

    /// Cached state, loading it from the store or creating a fresh profile
    /// on first contact.
    async fn load_or_create(&mut self, identity: &Identity) -> Result<&mut UserState, StoreError> {
        let state = match self.state.take() {
            Some(state) => state,
            None => match self.store.load(self.user_id).await? {
                Some(state) => state,
                None => self.create(identity).await?,
            },
        };
        Ok(self.state.insert(state))
    }

    /// Cached or stored state, without creating anything.
    async fn load_existing(&mut self) -> Result<Option<&mut UserState>, StoreError> {
        if self.state.is_none() {
            self.state = self.store.load(self.user_id).await?;
        }
        Ok(self.state.as_mut())
    }

    async fn create(&self, identity: &Identity) -> Result<UserState, StoreError> {
        let profile = Profile::new(identity, self.config.free_uses, &self.config.default_locale);
        self.registry.put(&profile.referral_code, self.user_id).await?;
        let state = UserState::new(profile);
        self.store.save(&state).await?;
        info!(
            "Created profile for user {} with referral code {} and {} free uses",
            self.user_id, state.profile.referral_code, self.config.free_uses
        );
        Ok(state)
    }

    /// Write the cached state through. On failure the cache is dropped so the
    /// next command starts again from what the store actually holds.
    async fn persist(&mut self) -> Result<(), StoreError> {
        let Some(state) = self.state.as_ref() else {
            return Ok(());
        };
        let result = self.store.save(state).await;
        if result.is_err() {
            warn!("Dropping cached session state for user {} after a failed write", self.user_id);
            self.state = None;
        }
        result
    }

    async fn ensure(&mut self, identity: Identity, referral: Option<String>) -> Result<UserState, StoreError> {
        let user_id = self.user_id;
        let registry = Arc::clone(&self.registry);
        let state = self.load_or_create(&identity).await?;
        let mut dirty = state.profile.refresh_identity(&identity);
        let mut referrer = None;

        let code = referral
            .as_deref()
            .and_then(normalize_code)
            .filter(|code| *code != state.profile.referral_code)
            .filter(|_| state.profile.referred_by.is_none());
        if let Some(code) = code {
            let owner = registry.get(&code).await?;
            match owner {
                Some(owner) if owner != user_id => {
                    info!("User {} was referred by user {} with code {}", user_id, owner, code);
                    state.profile.referred_by = Some(code);
                    referrer = Some(owner);
                    dirty = true;
                }
                Some(_) => debug!("User {} used their own referral code, ignoring", user_id),
                None => debug!("Unknown referral code {} from user {}, ignoring", code, user_id),
            }
        }

        let snapshot = state.clone();
        if dirty {
            self.persist().await?;
        }
        if let Some(owner) = referrer {
            match self.peers.upgrade() {
                Some(peers) => peers.credit_referral(owner, user_id).await,
                None => warn!("Session directory gone, referral credit for user {} dropped", owner),
            }
        }
        Ok(snapshot)
    }

    async fn can_consume(&mut self) -> Result<bool, StoreError> {
        let state = self.load_or_create(&Identity::bare(self.user_id)).await?;
        Ok(state.profile.quota.can_consume())
    }

    #[cfg(test)]
    async fn consume(&mut self) -> Result<bool, StoreError> {
        let state = self.load_or_create(&Identity::bare(self.user_id)).await?;
        match state.profile.consume_use() {
            Some(source) => {
                debug!("User {} consumed one use from {:?}", state.user_id(), source);
                self.persist().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the pending slot. There is at most one unresolved expectation;
    /// a new selection supersedes the old one rather than queuing behind it.
    /// Quota is only checked here, it is spent on fulfilment.
    async fn begin_pending(
        &mut self,
        action: PendingAction,
        category: AssetCategory,
        symbol: String,
    ) -> Result<BeginOutcome, StoreError> {
        let state = self.load_or_create(&Identity::bare(self.user_id)).await?;
        if !state.profile.quota.can_consume() {
            info!("User {} blocked from {} on {}: quota exhausted", state.user_id(), action, symbol);
            return Ok(BeginOutcome::Blocked);
        }
        if let Some(previous) = &state.memory.pending {
            debug!(
                "User {} replaces pending {} on {} with {} on {}",
                state.user_id(),
                previous.action,
                previous.symbol,
                action,
                symbol
            );
        }
        state.memory.set_pending(action, category, symbol);
        self.persist().await?;
        Ok(BeginOutcome::Ready)
    }

    async fn fulfill_with_image(&mut self, chat_id: i64, image: ChartImage) -> Result<ImageOutcome, StoreError> {
        let config = Arc::clone(&self.config);
        let state = self.load_or_create(&Identity::bare(self.user_id)).await?;
        let Some(slot) = state
            .memory
            .pending
            .clone()
            .filter(|slot| slot.action == PendingAction::AwaitingChart)
        else {
            return Ok(ImageOutcome::NeedMenu);
        };
        let Some(funded_by) = state.profile.consume_use() else {
            info!("User {} sent a chart for {} with no quota left", state.user_id(), slot.symbol);
            return Ok(ImageOutcome::Blocked);
        };
        state.memory.resolve_pending();

        let mut request = build_request(&config, &state.memory, state.user_id(), chat_id, slot);
        request.chart_image = Some(image);
        self.persist().await?;
        Ok(ImageOutcome::Request(PreparedSignal { request, funded_by }))
    }

    async fn fulfill_with_text(&mut self, chat_id: i64, text: String) -> Result<TextOutcome, StoreError> {
        let config = Arc::clone(&self.config);
        let state = self.load_or_create(&Identity::bare(self.user_id)).await?;
        let slot = match state.memory.pending.clone() {
            Some(slot) if slot.action == PendingAction::AwaitingPrompt => slot,
            Some(slot) => return Ok(TextOutcome::AwaitChart(slot.symbol)),
            None => return Ok(TextOutcome::Ignored),
        };
        let Some(funded_by) = state.profile.consume_use() else {
            info!("User {} sent a prompt for {} with no quota left", state.user_id(), slot.symbol);
            return Ok(TextOutcome::Blocked);
        };
        state.memory.resolve_pending();
        state.memory.recent_notes.push(text.as_str());

        let mut request = build_request(&config, &state.memory, state.user_id(), chat_id, slot);
        request.user_prompt = Some(text);
        self.persist().await?;
        Ok(TextOutcome::Ready(PreparedSignal { request, funded_by }))
    }

    async fn select_asset(&mut self, category: AssetCategory, symbol: Option<String>) -> Result<(), StoreError> {
        let state = self.load_or_create(&Identity::bare(self.user_id)).await?;
        state.memory.last_category = Some(category);
        if symbol.is_some() {
            state.memory.last_symbol = symbol;
        }
        self.persist().await
    }

    async fn set_preferences(&mut self, preferences: Preferences) -> Result<Memory, StoreError> {
        let state = self.load_or_create(&Identity::bare(self.user_id)).await?;
        let memory = &mut state.memory;
        if let Some(timeframe) = preferences.timeframe {
            memory.last_timeframe = Some(timeframe);
        }
        if let Some(style) = preferences.style {
            memory.last_style = Some(style);
        }
        if let Some(risk) = preferences.risk {
            memory.last_risk = Some(risk);
        }
        let memory = memory.clone();
        self.persist().await?;
        Ok(memory)
    }

    async fn record_note(&mut self, text: String) -> Result<(), StoreError> {
        let state = self.load_or_create(&Identity::bare(self.user_id)).await?;
        state.memory.recent_notes.push(text);
        self.persist().await
    }

    async fn credit_referral(&mut self, referee: i64) -> Result<(), StoreError> {
        let user_id = self.user_id;
        let threshold = self.config.referrals_for_bonus;
        let bonus = self.config.bonus_uses;
        let Some(state) = self.load_existing().await? else {
            warn!("Referral credit from user {} for unknown user {} dropped", referee, user_id);
            return Ok(());
        };
        let granted = state.profile.record_referral(threshold, bonus);
        info!(
            "User {} credited for referring user {} (referrals: {})",
            state.user_id(),
            referee,
            state.profile.referrals
        );
        if granted {
            info!("User {} earned {} bonus uses from referrals", state.user_id(), bonus);
        }
        self.persist().await
    }

    async fn admin_add_balance(&mut self, amount: u64) -> Result<Profile, StoreError> {
        let state = self.load_or_create(&Identity::bare(self.user_id)).await?;
        state.profile.add_wallet_balance(amount);
        info!("Admin added {} to wallet of user {}", amount, state.user_id());
        let profile = state.profile.clone();
        self.persist().await?;
        Ok(profile)
    }

    async fn admin_grant_uses(&mut self, uses: u32) -> Result<Profile, StoreError> {
        let state = self.load_or_create(&Identity::bare(self.user_id)).await?;
        state.profile.grant_bonus_uses(uses);
        info!("Admin granted {} bonus uses to user {}", uses, state.user_id());
        let profile = state.profile.clone();
        self.persist().await?;
        Ok(profile)
    }
}

fn build_request(
    config: &SessionConfig,
    memory: &Memory,
    user_id: i64,
    chat_id: i64,
    slot: PendingSlot,
) -> SignalRequest {
    SignalRequest {
        user_id,
        chat_id,
        symbol: slot.symbol,
        category: slot.category,
        timeframe: memory
            .last_timeframe
            .clone()
            .unwrap_or_else(|| config.default_timeframe.clone()),
        style: memory
            .last_style
            .clone()
            .unwrap_or_else(|| config.default_style.clone()),
        risk: memory
            .last_risk
            .clone()
            .unwrap_or_else(|| config.default_risk.clone()),
        user_prompt: None,
        chart_image: None,
        memory_summary: memory.recent_notes.summary(),
        vision_summary: None,
        news_digest: None,
    }
}
