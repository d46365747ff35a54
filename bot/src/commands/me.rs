use shared::{Profile, UserState};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::info;

use super::{ensure_sender, locale_of, menu};
use crate::i18n::translate;
use crate::session::Preferences;
use crate::state::{AppState, HandlerResult};

const TIMEFRAMES: [&str; 8] = ["M1", "M5", "M15", "M30", "H1", "H4", "D1", "W1"];
const STYLES: [&str; 4] = ["scalp", "intraday", "swing", "position"];
const RISKS: [&str; 3] = ["low", "medium", "high"];

/// Handler for the /me command to show user profile information
pub async fn handle_me(bot: Bot, msg: Message, state: Arc<AppState>) -> HandlerResult {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    info!("Handling /me command for user {}", from.id);
    let (session, user) = ensure_sender(&state, from, None).await?;
    let locale = locale_of(&state, &user);

    let current = session.snapshot().await?;
    let text = format!(
        "{}\n\n{}",
        profile_text(locale, &current),
        referral_text(locale, &state, &current.profile)
    );
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(menu::main_menu(locale))
        .await?;
    Ok(())
}

/// Handler for `/prefs <timeframe> [style] [risk]`.
pub async fn handle_prefs(bot: Bot, msg: Message, args: String, state: Arc<AppState>) -> HandlerResult {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let (session, user) = ensure_sender(&state, from, None).await?;
    let locale = locale_of(&state, &user);

    let Some(preferences) = parse_preferences(&args) else {
        let usage = translate(
            locale,
            "prefs_usage",
            Some(&[
                ("timeframes", &TIMEFRAMES.join(", ")),
                ("styles", &STYLES.join(", ")),
                ("risks", &RISKS.join(", ")),
            ]),
        );
        bot.send_message(msg.chat.id, usage).parse_mode(ParseMode::Html).await?;
        return Ok(());
    };

    let memory = session.set_preferences(preferences).await?;
    let config = state.sessions.config();
    let text = translate(
        locale,
        "prefs_saved",
        Some(&[
            ("timeframe", memory.last_timeframe.as_deref().unwrap_or(&config.default_timeframe)),
            ("style", memory.last_style.as_deref().unwrap_or(&config.default_style)),
            ("risk", memory.last_risk.as_deref().unwrap_or(&config.default_risk)),
        ]),
    );
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(menu::main_menu(locale))
        .await?;
    Ok(())
}

/// Positional `<timeframe> [style] [risk]`, validated against the known values.
pub(crate) fn parse_preferences(args: &str) -> Option<Preferences> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let pick = |index: usize, allowed: &[&str], upper: bool| -> Option<Option<String>> {
        let Some(raw) = parts.get(index) else {
            return Some(None);
        };
        let value = if upper { raw.to_uppercase() } else { raw.to_lowercase() };
        allowed.contains(&value.as_str()).then_some(Some(value))
    };
    Some(Preferences {
        timeframe: pick(0, &TIMEFRAMES, true)?,
        style: pick(1, &STYLES, false)?,
        risk: pick(2, &RISKS, false)?,
    })
}

pub(crate) fn profile_text(locale: &str, user: &UserState) -> String {
    let profile = &user.profile;
    let memory = &user.memory;
    let name = profile
        .first_name
        .clone()
        .or_else(|| profile.username.as_ref().map(|u| format!("@{}", u)))
        .unwrap_or_else(|| profile.id.to_string());
    translate(
        locale,
        "profile_text",
        Some(&[
            ("name", &name),
            ("user_id", &profile.id.to_string()),
            ("plan", profile.plan.as_str()),
            ("free", &profile.quota.free_uses().to_string()),
            ("bonus", &profile.quota.bonus_uses().to_string()),
            ("wallet", &profile.quota.wallet_balance().to_string()),
            ("referrals", &profile.referrals.to_string()),
            ("last_symbol", memory.last_symbol.as_deref().unwrap_or("-")),
            ("created", &profile.created_at.format("%Y-%m-%d").to_string()),
        ]),
    )
}

pub(crate) fn wallet_text(locale: &str, profile: &Profile) -> String {
    translate(
        locale,
        "wallet_text",
        Some(&[("wallet", &profile.quota.wallet_balance().to_string())]),
    )
}

pub(crate) fn referral_text(locale: &str, state: &AppState, profile: &Profile) -> String {
    let session = state.sessions.config();
    translate(
        locale,
        "referral_text",
        Some(&[
            ("link", &referral_link(&state.config.bot_username, &profile.referral_code)),
            ("code", &profile.referral_code),
            ("referrals", &profile.referrals.to_string()),
            ("threshold", &session.referrals_for_bonus.to_string()),
            ("bonus", &session.bonus_uses.to_string()),
        ]),
    )
}

pub(crate) fn referral_link(bot_username: &str, code: &str) -> String {
    format!("https://t.me/{}?start={}", bot_username.trim_start_matches('@'), code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_preferences() {
        let prefs = parse_preferences("h4 Scalp LOW").unwrap();
        assert_eq!(prefs.timeframe.as_deref(), Some("H4"));
        assert_eq!(prefs.style.as_deref(), Some("scalp"));
        assert_eq!(prefs.risk.as_deref(), Some("low"));
    }

    #[test]
    fn test_parse_partial_preferences() {
        let prefs = parse_preferences(" D1 ").unwrap();
        assert_eq!(prefs.timeframe.as_deref(), Some("D1"));
        assert_eq!(prefs.style, None);
        assert_eq!(prefs.risk, None);
    }

    #[test]
    fn test_reject_bad_preferences() {
        assert!(parse_preferences("").is_none());
        assert!(parse_preferences("H2").is_none());
        assert!(parse_preferences("H1 yolo").is_none());
        assert!(parse_preferences("H1 swing low extra").is_none());
    }

    #[test]
    fn test_referral_link() {
        assert_eq!(
            referral_link("@SniperLMBot", "2N9C-1A2B"),
            "https://t.me/SniperLMBot?start=2N9C-1A2B"
        );
    }
}
