use shared::Profile;
use std::sync::Arc;
use std::time::Instant;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::info;

use super::{ensure_sender, locale_of, menu};
use crate::i18n::translate;
use crate::state::{AppState, HandlerResult};

/// Handler for `/start [referral code]`.
pub async fn handle_start(bot: Bot, msg: Message, payload: String, state: Arc<AppState>) -> HandlerResult {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let referral = Some(payload.trim().to_string()).filter(|p| !p.is_empty());
    info!("Processing /start command from user {} (referral: {:?})", from.id, referral);

    let (_, user) = ensure_sender(&state, from, referral).await?;
    let locale = locale_of(&state, &user);
    bot.send_message(msg.chat.id, welcome_text(locale, &state, &user.profile))
        .parse_mode(ParseMode::Html)
        .reply_markup(menu::main_menu(locale))
        .await?;
    Ok(())
}

pub async fn handle_help(bot: Bot, msg: Message, state: Arc<AppState>) -> HandlerResult {
    let start_time = Instant::now();
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let (_, user) = ensure_sender(&state, from, None).await?;
    let locale = locale_of(&state, &user);

    let mut help_text = translate(locale, "cmd_help_title", None);
    for (command, key) in [
        ("/start", "cmd_help_start"),
        ("/help", "cmd_help_help"),
        ("/me", "cmd_help_me"),
        ("/prefs", "cmd_help_prefs"),
        ("/version", "cmd_help_version"),
    ] {
        help_text.push_str(&format!("\n{} - {}", command, translate(locale, key, None)));
    }
    help_text.push_str("\n\n");
    help_text.push_str(&translate(locale, "cmd_help_footer", None));

    bot.send_message(msg.chat.id, help_text)
        .parse_mode(ParseMode::Html)
        .reply_markup(menu::main_menu(locale))
        .await?;
    info!("Time taken to handle /help command: {:?}", start_time.elapsed());
    Ok(())
}

pub(crate) fn welcome_text(locale: &str, state: &AppState, profile: &Profile) -> String {
    translate(
        locale,
        "welcome",
        Some(&[
            ("bot_name", &state.config.bot_name),
            ("free", &profile.quota.free_uses().to_string()),
            ("bonus", &profile.quota.bonus_uses().to_string()),
            ("wallet", &profile.quota.wallet_balance().to_string()),
        ]),
    )
}
