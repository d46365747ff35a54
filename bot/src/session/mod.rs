//! Per-user session actors.
//!
//! Every user id is served by one actor task that owns the user's profile
//! and memory and applies commands strictly one at a time. That ordering is
//! what makes the quota check-and-spend and the pending-slot updates atomic
//! without locks. Actors talk to each other only for referral credit, which
//! is a one-way message.

mod actor;
mod command;
mod directory;
mod handle;


pub use command::{BeginOutcome, ImageOutcome, Preferences, PreparedSignal, TextOutcome};
pub use directory::SessionDirectory;
pub use handle::SessionHandle;

use shared::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Session for user {0} is unavailable")]
    Unavailable(i64),
}
