//! Enrich a paid-for request, generate the signal and report it.

use shared::SignalOutput;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{info, warn};

use super::menu;
use crate::i18n::{escape_html, translate};
use crate::session::{PreparedSignal, SessionHandle};
use crate::state::{AppState, HandlerResult};

pub(crate) async fn run_signal(
    bot: &Bot,
    chat_id: ChatId,
    state: &AppState,
    session: &SessionHandle,
    locale: &str,
    prepared: PreparedSignal,
) -> HandlerResult {
    let PreparedSignal { mut request, funded_by } = prepared;
    info!(
        "Generating signal for user {} on {} (funded by {:?})",
        request.user_id, request.symbol, funded_by
    );
    bot.send_message(chat_id, translate(locale, "analyzing", None))
        .parse_mode(ParseMode::Html)
        .await?;

    if let Some(image) = request.chart_image.as_ref() {
        let summary = state.vision.summarize(image, &request.symbol).await;
        request.vision_summary = Some(summary).filter(|s| !s.is_empty());
    }
    let digest = state.news.fetch(&request.symbol).await;
    request.news_digest = Some(digest.prompt_block()).filter(|b| !b.is_empty());

    let mut signal = state.signals.generate(&request).await;
    if !digest.headlines.is_empty() {
        signal.news_score = digest.score;
        if !digest.summary.is_empty() {
            signal.news_summary = digest.summary.clone();
        }
    }

    bot.send_message(chat_id, signal_text(locale, &signal))
        .parse_mode(ParseMode::Html)
        .reply_markup(menu::main_menu(locale))
        .await?;

    // The use is already spent; losing the note only costs context.
    if let Err(e) = session.record_note(signal.note()).await {
        warn!("Failed to record signal note for user {}: {}", request.user_id, e);
    }
    Ok(())
}

pub(crate) fn signal_text(locale: &str, signal: &SignalOutput) -> String {
    let mut lines = vec![
        translate(locale, "signal_title", Some(&[("symbol", &signal.symbol)])),
        translate(
            locale,
            "signal_header",
            Some(&[("timeframe", &signal.timeframe), ("style", &signal.style)]),
        ),
        translate(
            locale,
            "signal_direction",
            Some(&[
                ("direction", &signal.direction.to_string()),
                ("confidence", &signal.confidence.to_string()),
            ]),
        ),
        String::new(),
        format!("🎯 Entry: <code>{}</code>", escape_html(&signal.entry)),
        format!("🛑 SL: <code>{}</code>", escape_html(&signal.stop_loss)),
    ];
    let mut section = |key: &str, items: &[String], code: bool| {
        if items.is_empty() {
            return;
        }
        lines.push(String::new());
        lines.push(translate(locale, key, None));
        lines.extend(items.iter().map(|item| {
            if code {
                format!("• <code>{}</code>", escape_html(item))
            } else {
                format!("• {}", escape_html(item))
            }
        }));
    };
    section("signal_take_profits", &signal.take_profits, true);
    section("signal_key_levels", &signal.key_levels, true);
    section("signal_rationale", &signal.rationale, false);
    section("signal_news", &signal.news_summary, false);
    section("signal_risk_notes", &signal.risk_notes, false);

    lines.push(String::new());
    lines.push(translate(
        locale,
        "signal_news_score",
        Some(&[("score", &signal.news_score.to_string())]),
    ));
    lines.push(format!("📎 <i>{}</i>", escape_html(&signal.disclaimer)));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Direction;

    #[test]
    fn test_signal_text_escapes_model_output() {
        let signal = SignalOutput {
            symbol: "XAUUSD".to_string(),
            timeframe: "H1".to_string(),
            style: "swing".to_string(),
            direction: Direction::Sell,
            entry: "<2350>".to_string(),
            stop_loss: "2361".to_string(),
            take_profits: vec!["2340".to_string()],
            confidence: 64,
            rationale: vec!["lower highs & rejection".to_string()],
            news_score: 6,
            disclaimer: "educational".to_string(),
            ..Default::default()
        };
        let text = signal_text("en", &signal);
        assert!(text.contains("&lt;2350&gt;"));
        assert!(text.contains("lower highs &amp; rejection"));
        assert!(text.contains("SELL"));
        assert!(text.contains("<code>2340</code>"));
    }
}
