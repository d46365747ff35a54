//! Plain messages: chart images and free-text prompts.

use shared::{ChartImage, Memory, PendingAction};
use std::sync::Arc;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, ParseMode};
use tracing::{debug, info};

use super::{ensure_sender, locale_of, menu, signal};
use crate::i18n::translate;
use crate::session::{ImageOutcome, TextOutcome};
use crate::state::{AppState, HandlerResult};

const PHOTO_MIME: &str = "image/jpeg";

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> HandlerResult {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let (session, user) = ensure_sender(&state, from, None).await?;
    let locale = locale_of(&state, &user);
    let chat_id = msg.chat.id;

    if let Some((file_id, mime)) = chart_attachment(&msg) {
        if user.memory.pending_action() != Some(PendingAction::AwaitingChart) {
            return send_with_menu(&bot, chat_id, locale, "choose_symbol_first").await;
        }
        let image = download(&bot, file_id, mime).await?;
        debug!("Downloaded {} byte chart from user {}", image.data.len(), from.id);
        return match session.fulfill_with_image(chat_id.0, image).await? {
            ImageOutcome::Request(prepared) => {
                signal::run_signal(&bot, chat_id, &state, &session, locale, prepared).await
            }
            ImageOutcome::NeedMenu => send_with_menu(&bot, chat_id, locale, "choose_symbol_first").await,
            ImageOutcome::Blocked => send_blocked(&bot, chat_id, locale).await,
        };
    }

    let text = msg.text().unwrap_or_default();
    if text.trim().is_empty() {
        let Some(reminder) = pending_reminder(locale, &user.memory) else {
            return send_with_menu(&bot, chat_id, locale, "choose_from_menu").await;
        };
        bot.send_message(chat_id, reminder)
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }

    match session.fulfill_with_text(chat_id.0, text.trim()).await? {
        TextOutcome::Ready(prepared) => {
            signal::run_signal(&bot, chat_id, &state, &session, locale, prepared).await
        }
        TextOutcome::AwaitChart(symbol) => {
            bot.send_message(
                chat_id,
                translate(locale, "awaiting_chart_for", Some(&[("symbol", &symbol)])),
            )
            .parse_mode(ParseMode::Html)
            .await?;
            Ok(())
        }
        TextOutcome::Ignored => send_with_menu(&bot, chat_id, locale, "choose_from_menu").await,
        TextOutcome::Blocked => send_blocked(&bot, chat_id, locale).await,
    }
}

/// What the pending slot is still waiting for, for messages that carry
/// neither a chart nor text.
fn pending_reminder(locale: &str, memory: &Memory) -> Option<String> {
    let slot = memory.pending.as_ref()?;
    Some(match slot.action {
        PendingAction::AwaitingChart => {
            translate(locale, "awaiting_chart_for", Some(&[("symbol", slot.symbol.as_str())]))
        }
        PendingAction::AwaitingPrompt => translate(locale, "prompt_empty", None),
    })
}

/// Largest photo size, or a document with an image mime type.
fn chart_attachment(msg: &Message) -> Option<(FileId, String)> {
    if let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) {
        return Some((largest.file.id.clone(), PHOTO_MIME.to_string()));
    }
    let document = msg.document()?;
    let mime = document.mime_type.as_ref()?.essence_str().to_string();
    mime.starts_with("image/")
        .then(|| (document.file.id.clone(), mime))
}

async fn download(bot: &Bot, file_id: FileId, mime: String) -> Result<ChartImage, anyhow::Error> {
    let file = bot.get_file(file_id).await?;
    let mut data = Vec::with_capacity(file.size as usize);
    bot.download_file(&file.path, &mut data).await?;
    Ok(ChartImage { mime, data })
}

async fn send_with_menu(bot: &Bot, chat_id: ChatId, locale: &str, key: &str) -> HandlerResult {
    bot.send_message(chat_id, translate(locale, key, None))
        .parse_mode(ParseMode::Html)
        .reply_markup(menu::main_menu(locale))
        .await?;
    Ok(())
}

async fn send_blocked(bot: &Bot, chat_id: ChatId, locale: &str) -> HandlerResult {
    info!("Chat {} has no quota left", chat_id);
    bot.send_message(chat_id, translate(locale, "quota_exhausted", None))
        .parse_mode(ParseMode::Html)
        .reply_markup(menu::top_up_menu(locale))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::AssetCategory;

    #[test]
    fn test_reminder_follows_pending_slot() {
        let mut memory = Memory::default();
        assert_eq!(pending_reminder("en", &memory), None);

        memory.set_pending(PendingAction::AwaitingChart, AssetCategory::Metals, "XAUUSD".to_string());
        assert_eq!(
            pending_reminder("en", &memory),
            Some(translate("en", "awaiting_chart_for", Some(&[("symbol", "XAUUSD")])))
        );

        memory.set_pending(PendingAction::AwaitingPrompt, AssetCategory::Metals, "XAUUSD".to_string());
        assert_eq!(pending_reminder("en", &memory), Some(translate("en", "prompt_empty", None)));
    }
}
