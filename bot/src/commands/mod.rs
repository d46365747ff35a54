use shared::{Identity, UserState};
use teloxide::types::User;
use teloxide::utils::command::BotCommands;

use crate::i18n;
use crate::session::SessionHandle;
use crate::state::AppState;

pub mod admin;
pub mod callback;
pub mod me;
pub mod menu;
pub mod message;
pub mod signal;
pub mod start;

pub use admin::{handle_admin_add_balance, handle_admin_grant_uses, handle_version};
pub use callback::handle_callback;
pub use me::{handle_me, handle_prefs};
pub use message::handle_message;
pub use start::{handle_help, handle_start};

/// 🎯 SniperLM commands
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "snake_case")]
pub enum Command {
    /// Start the bot (optionally with a referral code)
    Start(String),
    /// Show help
    Help,
    /// Show your profile, quota and referral link
    Me,
    /// Set default timeframe, style and risk
    Prefs(String),
    /// Show the bot version
    Version,
    /// Admin: add wallet balance to a user
    AdminAddBalance(String),
    /// Admin: grant bonus uses to a user
    AdminGrantUses(String),
}

pub(crate) fn identity_of(user: &User) -> Identity {
    Identity {
        user_id: user.id.0 as i64,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()).filter(|name| !name.is_empty()),
    }
}

/// Resolve the sender's session and make sure their profile exists.
pub(crate) async fn ensure_sender(
    state: &AppState,
    user: &User,
    referral: Option<String>,
) -> Result<(SessionHandle, UserState), anyhow::Error> {
    let identity = identity_of(user);
    let session = state.sessions.session(identity.user_id).await;
    let user_state = session.ensure(identity, referral).await?;
    Ok((session, user_state))
}

pub(crate) fn locale_of<'a>(state: &'a AppState, user: &'a UserState) -> &'a str {
    i18n::resolve_locale(user.profile.language.as_deref(), &state.config.bot_locale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("/start 21I3V9-ABCD", "SniperLMBot").unwrap(),
            Command::Start("21I3V9-ABCD".to_string())
        );
        assert_eq!(
            Command::parse("/start", "SniperLMBot").unwrap(),
            Command::Start(String::new())
        );
        assert_eq!(
            Command::parse("/admin_add_balance 42 10", "SniperLMBot").unwrap(),
            Command::AdminAddBalance("42 10".to_string())
        );
        assert_eq!(Command::parse("/me", "SniperLMBot").unwrap(), Command::Me);
    }
}
