use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::info;

use super::{ensure_sender, locale_of};
use crate::i18n::translate;
use crate::state::{AppState, HandlerResult};

/// Handler for the /version command to check the current git version of the bot.
pub async fn handle_version(bot: Bot, msg: Message) -> HandlerResult {
    let start_time = Instant::now();
    // Embedded by build.rs; "unknown" outside a git checkout.
    let git_hash = option_env!("GIT_HASH").unwrap_or("unknown");
    let git_branch = option_env!("GIT_BRANCH").unwrap_or("unknown");
    let git_tag = option_env!("GIT_TAG").unwrap_or("unknown");

    let build_time_raw = option_env!("BUILD_TIME").unwrap_or("unknown");
    let build_time_human = build_time_raw
        .parse::<i64>()
        .ok()
        .and_then(|epoch| chrono::DateTime::from_timestamp(epoch, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| build_time_raw.to_string());

    let version_info = format!(
        "🤖 <b>Bot Version</b> <code>{}</code>\n\
        <b>Branch:</b> <code>{}</code>\n\
        <b>Tag:</b> <code>{}</code>\n\
        <b>Commit:</b> <code>{}</code>\n\
        <b>Build Time:</b> <code>{}</code>\n\
        <b>OS:</b> <code>{}</code>",
        env!("CARGO_PKG_VERSION"),
        git_branch,
        git_tag,
        git_hash,
        build_time_human,
        option_env!("CARGO_CFG_TARGET_OS").unwrap_or("unknown")
    );

    bot.send_message(msg.chat.id, version_info)
        .parse_mode(ParseMode::Html)
        .await?;
    info!("Time taken to handle /version command: {:?}", start_time.elapsed());
    Ok(())
}

/// `/admin_add_balance <userId> <amount>`; only routed for admins.
pub async fn handle_admin_add_balance(bot: Bot, msg: Message, args: String, state: Arc<AppState>) -> HandlerResult {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let (_, admin) = ensure_sender(&state, from, None).await?;
    let locale = locale_of(&state, &admin);

    let Some((target, amount)) = parse_admin_args::<u64>(&args) else {
        bot.send_message(msg.chat.id, translate(locale, "admin_add_balance_usage", None))
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    };

    info!("Admin {} adds {} to wallet of user {}", from.id, amount, target);
    let profile = state.sessions.session(target).await.admin_add_balance(amount).await?;
    let text = translate(
        locale,
        "admin_add_balance_done",
        Some(&[
            ("user_id", &target.to_string()),
            ("amount", &amount.to_string()),
            ("wallet", &profile.quota.wallet_balance().to_string()),
        ]),
    );
    bot.send_message(msg.chat.id, text).parse_mode(ParseMode::Html).await?;
    Ok(())
}

/// `/admin_grant_uses <userId> <uses>`; only routed for admins.
pub async fn handle_admin_grant_uses(bot: Bot, msg: Message, args: String, state: Arc<AppState>) -> HandlerResult {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let (_, admin) = ensure_sender(&state, from, None).await?;
    let locale = locale_of(&state, &admin);

    let Some((target, uses)) = parse_admin_args::<u32>(&args) else {
        bot.send_message(msg.chat.id, translate(locale, "admin_grant_uses_usage", None))
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    };

    info!("Admin {} grants {} uses to user {}", from.id, uses, target);
    let profile = state.sessions.session(target).await.admin_grant_uses(uses).await?;
    let text = translate(
        locale,
        "admin_grant_uses_done",
        Some(&[
            ("user_id", &target.to_string()),
            ("uses", &uses.to_string()),
            ("bonus", &profile.quota.bonus_uses().to_string()),
        ]),
    );
    bot.send_message(msg.chat.id, text).parse_mode(ParseMode::Html).await?;
    Ok(())
}

/// `<userId> <positive amount>` and nothing else.
pub(crate) fn parse_admin_args<T>(args: &str) -> Option<(i64, T)>
where
    T: FromStr + PartialEq + Default,
{
    let mut parts = args.split_whitespace();
    let target: i64 = parts.next()?.parse().ok()?;
    let amount: T = parts.next()?.parse().ok()?;
    if parts.next().is_some() || target == 0 || amount == T::default() {
        return None;
    }
    Some((target, amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_args() {
        assert_eq!(parse_admin_args::<u64>("12345 20"), Some((12345, 20)));
        assert_eq!(parse_admin_args::<u32>("  7   3 "), Some((7, 3)));
    }

    #[test]
    fn test_reject_malformed_admin_args() {
        assert_eq!(parse_admin_args::<u64>(""), None);
        assert_eq!(parse_admin_args::<u64>("12345"), None);
        assert_eq!(parse_admin_args::<u64>("12345 0"), None);
        assert_eq!(parse_admin_args::<u64>("12345 -5"), None);
        assert_eq!(parse_admin_args::<u64>("abc 5"), None);
        assert_eq!(parse_admin_args::<u32>("1 2 3"), None);
    }
}
