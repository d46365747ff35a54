use shared::{
    AssetCategory, ChartImage, Identity, Memory, PendingAction, Profile, StoreError, UserState,
};
use tokio::sync::{mpsc, oneshot};

use super::command::{
    BeginOutcome, ImageOutcome, Preferences, Reply, SessionCommand, TextOutcome,
};
use super::directory::WeakSessionDirectory;
use super::SessionError;

/// Address of one user's session actor. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    user_id: i64,
    generation: u64,
    tx: mpsc::UnboundedSender<SessionCommand>,
    directory: WeakSessionDirectory,
}

impl SessionHandle {
    pub(crate) fn new(
        user_id: i64,
        generation: u64,
        tx: mpsc::UnboundedSender<SessionCommand>,
        directory: WeakSessionDirectory,
    ) -> Self {
        Self {
            user_id,
            generation,
            tx,
            directory,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue a command. If the actor behind this handle has retired, the
    /// command goes to the user's current actor instead.
    pub(crate) async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        let command = match self.tx.send(command) {
            Ok(()) => return Ok(()),
            Err(mpsc::error::SendError(command)) => command,
        };
        let directory = self
            .directory
            .upgrade()
            .ok_or(SessionError::Unavailable(self.user_id))?;
        let current = directory.session(self.user_id).await;
        current
            .tx
            .send(command)
            .map_err(|_| SessionError::Unavailable(self.user_id))
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> SessionCommand) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel::<Result<T, StoreError>>();
        self.send(command(reply)).await?;
        let result = response
            .await
            .map_err(|_| SessionError::Unavailable(self.user_id))?;
        Ok(result?)
    }

    /// Create the profile on first contact, refresh display metadata and
    /// attribute a referral if `referral` names another user's code.
    pub async fn ensure(&self, identity: Identity, referral: Option<String>) -> Result<UserState, SessionError> {
        self.request(|reply| SessionCommand::Ensure {
            identity,
            referral,
            reply,
        })
        .await
    }

    pub async fn can_consume(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::CanConsume { reply }).await
    }

    /// Spend one use (free, then bonus, then wallet). `false` when empty.
    /// Requests spend through the fulfil operations; this is the bare draw.
    #[cfg(test)]
    pub async fn consume(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::Consume { reply }).await
    }

    pub async fn begin_pending(
        &self,
        action: PendingAction,
        category: AssetCategory,
        symbol: impl Into<String>,
    ) -> Result<BeginOutcome, SessionError> {
        let symbol = symbol.into();
        self.request(|reply| SessionCommand::BeginPending {
            action,
            category,
            symbol,
            reply,
        })
        .await
    }

    pub async fn fulfill_with_image(&self, chat_id: i64, image: ChartImage) -> Result<ImageOutcome, SessionError> {
        self.request(|reply| SessionCommand::FulfillWithImage {
            chat_id,
            image,
            reply,
        })
        .await
    }

    pub async fn fulfill_with_text(&self, chat_id: i64, text: impl Into<String>) -> Result<TextOutcome, SessionError> {
        let text = text.into();
        self.request(|reply| SessionCommand::FulfillWithText {
            chat_id,
            text,
            reply,
        })
        .await
    }

    pub async fn select_asset(&self, category: AssetCategory, symbol: Option<String>) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::SelectAsset {
            category,
            symbol,
            reply,
        })
        .await
    }

    pub async fn set_preferences(&self, preferences: Preferences) -> Result<Memory, SessionError> {
        self.request(|reply| SessionCommand::SetPreferences { preferences, reply })
            .await
    }

    pub async fn record_note(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| SessionCommand::RecordNote { text, reply })
            .await
    }

    /// Fire-and-forget: queued behind whatever the actor is doing.
    pub(crate) async fn credit_referral(&self, referee: i64) -> Result<(), SessionError> {
        self.send(SessionCommand::CreditReferral { referee }).await
    }

    pub async fn admin_add_balance(&self, amount: u64) -> Result<Profile, SessionError> {
        self.request(|reply| SessionCommand::AdminAddBalance { amount, reply })
            .await
    }

    pub async fn admin_grant_uses(&self, uses: u32) -> Result<Profile, SessionError> {
        self.request(|reply| SessionCommand::AdminGrantUses { uses, reply })
            .await
    }

    pub async fn profile(&self) -> Result<Profile, SessionError> {
        Ok(self.snapshot().await?.profile)
    }

    pub async fn snapshot(&self) -> Result<UserState, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }
}
