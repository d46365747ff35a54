use shared::{AssetCategory, PendingAction};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, ParseMode};
use tracing::{debug, info, warn};

use super::{ensure_sender, locale_of, me, menu, start};
use crate::i18n::{escape_html, translate};
use crate::session::BeginOutcome;
use crate::state::{AppState, HandlerResult};

/// Decoded inline-button payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Home,
    Signal,
    Profile,
    Wallet,
    Referral,
    Support,
    Category(AssetCategory),
    Symbol(AssetCategory, String),
    Chart(AssetCategory, String),
    Prompt(AssetCategory, String),
    News(AssetCategory, String),
    Unknown(String),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Self {
        let parts: Vec<&str> = data.split(':').collect();
        let action = match parts.as_slice() {
            ["menu", "home"] => Some(CallbackAction::Home),
            ["menu", "signal"] => Some(CallbackAction::Signal),
            ["menu", "profile"] => Some(CallbackAction::Profile),
            ["menu", "wallet"] => Some(CallbackAction::Wallet),
            ["menu", "referral"] => Some(CallbackAction::Referral),
            ["menu", "support"] => Some(CallbackAction::Support),
            ["cat", category] => category.parse().ok().map(CallbackAction::Category),
            ["sym", category, symbol] => asset(category, symbol).map(|(c, s)| CallbackAction::Symbol(c, s)),
            ["act", "chart", category, symbol] => asset(category, symbol).map(|(c, s)| CallbackAction::Chart(c, s)),
            ["act", "prompt", category, symbol] => asset(category, symbol).map(|(c, s)| CallbackAction::Prompt(c, s)),
            ["act", "news", category, symbol] => asset(category, symbol).map(|(c, s)| CallbackAction::News(c, s)),
            _ => None,
        };
        action.unwrap_or_else(|| CallbackAction::Unknown(data.to_string()))
    }
}

/// A catalog symbol in its own category.
fn asset(category: &str, symbol: &str) -> Option<(AssetCategory, String)> {
    let category: AssetCategory = category.parse().ok()?;
    category
        .contains(symbol)
        .then(|| (category, symbol.to_string()))
}

pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(message) = q.message.as_ref() else {
        debug!("Callback from user {} without a message, ignoring", q.from.id);
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();
    let (session, user) = ensure_sender(&state, &q.from, None).await?;
    let locale = locale_of(&state, &user);
    let action = CallbackAction::parse(q.data.as_deref().unwrap_or_default());
    debug!("User {} pressed {:?}", q.from.id, action);

    let edit = |text: String, markup: InlineKeyboardMarkup| {
        bot.edit_message_text(chat_id, message_id, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(markup)
    };

    match action {
        CallbackAction::Home => {
            edit(start::welcome_text(locale, &state, &user.profile), menu::main_menu(locale)).await?;
        }
        CallbackAction::Signal => {
            if session.can_consume().await? {
                edit(translate(locale, "choose_category", None), menu::categories_menu(locale)).await?;
            } else {
                info!("User {} opened the signal menu with no quota left", q.from.id);
                edit(translate(locale, "quota_exhausted", None), menu::top_up_menu(locale)).await?;
            }
        }
        CallbackAction::Profile => {
            let current = session.snapshot().await?;
            edit(me::profile_text(locale, &current), menu::main_menu(locale)).await?;
        }
        CallbackAction::Wallet => {
            let profile = session.profile().await?;
            edit(me::wallet_text(locale, &profile), menu::main_menu(locale)).await?;
        }
        CallbackAction::Referral => {
            let profile = session.profile().await?;
            edit(me::referral_text(locale, &state, &profile), menu::main_menu(locale)).await?;
        }
        CallbackAction::Support => {
            edit(translate(locale, "support_text", None), menu::main_menu(locale)).await?;
        }
        CallbackAction::Category(category) => {
            session.select_asset(category, None).await?;
            edit(
                translate(locale, "choose_symbol", None),
                menu::symbols_menu(locale, category),
            )
            .await?;
        }
        CallbackAction::Symbol(category, symbol) => {
            session.select_asset(category, Some(symbol.clone())).await?;
            edit(
                translate(locale, "choose_action", Some(&[("symbol", &symbol)])),
                menu::asset_action_menu(locale, category, &symbol),
            )
            .await?;
        }
        CallbackAction::Chart(category, symbol) => {
            let outcome = session
                .begin_pending(PendingAction::AwaitingChart, category, symbol.clone())
                .await?;
            reply_to_begin(&bot, chat_id, locale, outcome, "ask_chart", &symbol).await?;
        }
        CallbackAction::Prompt(category, symbol) => {
            let outcome = session
                .begin_pending(PendingAction::AwaitingPrompt, category, symbol.clone())
                .await?;
            reply_to_begin(&bot, chat_id, locale, outcome, "ask_prompt", &symbol).await?;
        }
        CallbackAction::News(category, symbol) => {
            let digest = state.news.fetch(&symbol).await;
            edit(
                news_text(locale, &symbol, &digest),
                menu::asset_action_menu(locale, category, &symbol),
            )
            .await?;
        }
        CallbackAction::Unknown(data) => {
            warn!("Unknown callback payload from user {}: {:?}", q.from.id, data);
            bot.send_message(chat_id, translate(locale, "unknown_action", None))
                .parse_mode(ParseMode::Html)
                .reply_markup(menu::main_menu(locale))
                .await?;
        }
    }
    Ok(())
}

async fn reply_to_begin(
    bot: &Bot,
    chat_id: ChatId,
    locale: &str,
    outcome: BeginOutcome,
    ask_key: &str,
    symbol: &str,
) -> HandlerResult {
    match outcome {
        BeginOutcome::Ready => {
            bot.send_message(chat_id, translate(locale, ask_key, Some(&[("symbol", symbol)])))
                .parse_mode(ParseMode::Html)
                .await?;
        }
        BeginOutcome::Blocked => {
            info!("Chat {} asked for {} with no quota left", chat_id, symbol);
            bot.send_message(chat_id, translate(locale, "quota_exhausted", None))
                .parse_mode(ParseMode::Html)
                .reply_markup(menu::top_up_menu(locale))
                .await?;
        }
    }
    Ok(())
}

fn news_text(locale: &str, symbol: &str, digest: &crate::services::news::NewsDigest) -> String {
    if digest.headlines.is_empty() {
        return translate(locale, "news_empty", Some(&[("symbol", symbol)]));
    }
    let mut lines = vec![translate(locale, "news_title", Some(&[("symbol", symbol)])), String::new()];
    lines.extend(
        digest
            .headlines
            .iter()
            .take(8)
            .enumerate()
            .map(|(i, h)| format!("{}) {}", i + 1, escape_html(h))),
    );
    lines.push(String::new());
    lines.push(translate(
        locale,
        "news_score",
        Some(&[("score", &digest.score.to_string())]),
    ));
    if !digest.reasons.is_empty() {
        lines.push(translate(locale, "news_reasons", None));
        lines.extend(digest.reasons.iter().map(|r| format!("• {}", escape_html(r))));
    }
    lines.join("\n")
}
