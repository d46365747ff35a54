mod asset;
mod memory;
mod profile;
mod quota;
mod signal;

pub use asset::AssetCategory;
pub use memory::{Memory, NoteLog, PendingAction, PendingSlot, NOTE_CAPACITY, NOTE_MAX_CHARS, SUMMARY_NOTES};
pub use profile::{Identity, Plan, Profile};
pub use quota::{FundingSource, Quota};
pub use signal::{ChartImage, Direction, SignalOutput, SignalRequest, DEFAULT_DISCLAIMER};

/// Profile and memory of one user, persisted together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserState {
    pub profile: Profile,
    pub memory: Memory,
}

impl UserState {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            memory: Memory::default(),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.profile.id
    }
}
