use shared::{
    AssetCategory, ChartImage, FundingSource, Identity, Memory, PendingAction, Profile, SignalRequest,
    StoreError, UserState,
};
use tokio::sync::oneshot;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

/// Messages accepted by a session actor. Each one is applied as a single
/// unit of work, in arrival order.
pub(crate) enum SessionCommand {
    Ensure {
        identity: Identity,
        referral: Option<String>,
        reply: Reply<UserState>,
    },
    CanConsume {
        reply: Reply<bool>,
    },
    #[cfg(test)]
    Consume {
        reply: Reply<bool>,
    },
    BeginPending {
        action: PendingAction,
        category: AssetCategory,
        symbol: String,
        reply: Reply<BeginOutcome>,
    },
    FulfillWithImage {
        chat_id: i64,
        image: ChartImage,
        reply: Reply<ImageOutcome>,
    },
    FulfillWithText {
        chat_id: i64,
        text: String,
        reply: Reply<TextOutcome>,
    },
    SelectAsset {
        category: AssetCategory,
        symbol: Option<String>,
        reply: Reply<()>,
    },
    SetPreferences {
        preferences: Preferences,
        reply: Reply<Memory>,
    },
    RecordNote {
        text: String,
        reply: Reply<()>,
    },
    /// One-way: the sender never waits for the outcome.
    CreditReferral {
        referee: i64,
    },
    AdminAddBalance {
        amount: u64,
        reply: Reply<Profile>,
    },
    AdminGrantUses {
        uses: u32,
        reply: Reply<Profile>,
    },
    Snapshot {
        reply: Reply<UserState>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    Ready,
    Blocked,
}

/// A paid-for request ready to be handed to the signal generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSignal {
    pub request: SignalRequest,
    pub funded_by: FundingSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    NeedMenu,
    Blocked,
    Request(PreparedSignal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOutcome {
    Ready(PreparedSignal),
    /// An image was expected for this symbol; nothing was changed.
    AwaitChart(String),
    Ignored,
    Blocked,
}

/// Selections that override the configured defaults. `None` keeps the
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub timeframe: Option<String>,
    pub style: Option<String>,
    pub risk: Option<String>,
}
