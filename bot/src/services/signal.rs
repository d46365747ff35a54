//! Structured signal generation.

use askama::Template;
use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{Direction, SignalOutput, SignalRequest, DEFAULT_DISCLAIMER};
use tracing::{info, warn};

use super::gemini::GeminiService;
use super::news::extract_json;

const NO_PROVIDER: &str = "No model provider is configured.";
const PROVIDER_FAILED: &str = "The model provider did not return a usable answer.";

#[async_trait]
pub trait SignalGenerator: Send + Sync {
    /// Never fails: a neutral low-confidence signal stands in when no
    /// provider answers.
    async fn generate(&self, request: &SignalRequest) -> SignalOutput;
}

#[derive(Template)]
#[template(path = "signal_prompt.txt", escape = "none")]
struct SignalPromptTemplate<'a> {
    language: &'a str,
    symbol: &'a str,
    category: &'a str,
    timeframe: &'a str,
    style: &'a str,
    risk: &'a str,
    user_prompt: &'a str,
    memory_summary: &'a str,
    vision_summary: &'a str,
    news_block: &'a str,
    schema: String,
}

pub struct GeminiSignalGenerator {
    gemini: Option<GeminiService>,
    language: String,
}

impl GeminiSignalGenerator {
    pub fn new(gemini: Option<GeminiService>, locale: &str) -> Self {
        Self {
            gemini,
            language: super::language_name(locale).to_string(),
        }
    }

    fn build_prompt(&self, request: &SignalRequest) -> Result<String, askama::Error> {
        fn or_none<'a>(value: Option<&'a str>, placeholder: &'a str) -> &'a str {
            value.filter(|v| !v.trim().is_empty()).unwrap_or(placeholder)
        }

        SignalPromptTemplate {
            language: &self.language,
            symbol: &request.symbol,
            category: request.category.as_str(),
            timeframe: &request.timeframe,
            style: &request.style,
            risk: &request.risk,
            user_prompt: or_none(request.user_prompt.as_deref(), "(none)"),
            memory_summary: or_none(Some(&request.memory_summary), "(none)"),
            vision_summary: or_none(
                request.vision_summary.as_deref(),
                "(no chart was sent or it could not be analyzed)",
            ),
            news_block: or_none(request.news_digest.as_deref(), "(no related news found)"),
            schema: output_schema(request),
        }
        .render()
    }
}

#[async_trait]
impl SignalGenerator for GeminiSignalGenerator {
    async fn generate(&self, request: &SignalRequest) -> SignalOutput {
        let Some(gemini) = &self.gemini else {
            return SignalOutput::neutral(request, NO_PROVIDER);
        };
        let prompt = match self.build_prompt(request) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Failed to render signal prompt: {}", e);
                return SignalOutput::neutral(request, PROVIDER_FAILED);
            }
        };
        let reply = match gemini.ask_question(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Signal generation for {} failed: {}", request.symbol, e);
                return SignalOutput::neutral(request, PROVIDER_FAILED);
            }
        };
        match serde_json::from_str::<Value>(extract_json(&reply)) {
            Ok(value) if value.as_object().is_some_and(|o| !o.is_empty()) => {
                let signal = sanitize(&value, request);
                info!(
                    "Generated {} signal for {} with confidence {}",
                    signal.direction, signal.symbol, signal.confidence
                );
                signal
            }
            _ => {
                warn!("Signal reply for {} was not a JSON object", request.symbol);
                SignalOutput::neutral(request, PROVIDER_FAILED)
            }
        }
    }
}

fn output_schema(request: &SignalRequest) -> String {
    let schema = json!({
        "symbol": request.symbol,
        "timeframe": request.timeframe,
        "style": request.style,
        "direction": "BUY",
        "entry": "string",
        "stopLoss": "string",
        "takeProfits": ["string"],
        "confidence": 70,
        "rationale": ["string"],
        "keyLevels": ["string"],
        "newsSummary": ["string"],
        "newsScore": 7,
        "riskNotes": ["string"],
        "disclaimer": DEFAULT_DISCLAIMER,
    });
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// Coerce a loosely shaped model reply into a bounded `SignalOutput`.
fn sanitize(value: &Value, request: &SignalRequest) -> SignalOutput {
    let text = |key: &str, default: &str| match value.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => default.to_string(),
    };
    let list = |key: &str, limit: usize| match value.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .take(limit)
            .collect(),
        _ => Vec::new(),
    };
    let number = |key: &str| {
        let n = match value.get(key) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        n.filter(|n| n.is_finite())
    };

    let direction = match text("direction", "NEUTRAL").to_uppercase().as_str() {
        "BUY" | "LONG" => Direction::Buy,
        "SELL" | "SHORT" => Direction::Sell,
        _ => Direction::Neutral,
    };
    let news_score = number("newsScore").or_else(|| number("newsScoreByGemma"));

    SignalOutput {
        symbol: text("symbol", &request.symbol),
        timeframe: text("timeframe", &request.timeframe),
        style: text("style", &request.style),
        direction,
        entry: text("entry", "N/A"),
        stop_loss: text("stopLoss", "N/A"),
        take_profits: list("takeProfits", 5),
        confidence: number("confidence").map(|n| n.round().clamp(0.0, 100.0) as u8).unwrap_or(0),
        rationale: list("rationale", 8),
        key_levels: list("keyLevels", 10),
        news_summary: list("newsSummary", 8),
        news_score: news_score.map(|n| n.round().clamp(1.0, 10.0) as u8).unwrap_or(5),
        risk_notes: list("riskNotes", 6),
        disclaimer: text("disclaimer", DEFAULT_DISCLAIMER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::AssetCategory;

    fn request() -> SignalRequest {
        SignalRequest {
            user_id: 1,
            chat_id: 1,
            symbol: "XAUUSD".to_string(),
            category: AssetCategory::Metals,
            timeframe: "H1".to_string(),
            style: "swing".to_string(),
            risk: "medium".to_string(),
            user_prompt: Some("looking for a pullback entry".to_string()),
            chart_image: None,
            memory_summary: String::new(),
            vision_summary: None,
            news_digest: None,
        }
    }

    #[test]
    fn test_sanitize_bounds_fields() {
        let reply = r#"Here you go:
{"symbol":"XAUUSD","direction":"buy","entry":2350.5,"stopLoss":"2338",
 "takeProfits":["1","2","3","4","5","6"],"confidence":"140","newsScoreByGemma":0,
 "rationale":["trend up"]}"#;
        let value: Value = serde_json::from_str(extract_json(reply)).unwrap();
        let signal = sanitize(&value, &request());
        assert_eq!(signal.direction, Direction::Buy);
        assert_eq!(signal.entry, "2350.5");
        assert_eq!(signal.take_profits.len(), 5);
        assert_eq!(signal.confidence, 100);
        assert_eq!(signal.news_score, 1);
        assert_eq!(signal.timeframe, "H1");
        assert_eq!(signal.disclaimer, DEFAULT_DISCLAIMER);
    }

    #[test]
    fn test_sanitize_defaults_on_missing_fields() {
        let signal = sanitize(&json!({"direction": "sideways"}), &request());
        assert_eq!(signal.direction, Direction::Neutral);
        assert_eq!(signal.entry, "N/A");
        assert_eq!(signal.confidence, 0);
        assert_eq!(signal.news_score, 5);
        assert_eq!(signal.symbol, "XAUUSD");
    }

    #[tokio::test]
    async fn test_without_provider_returns_neutral() {
        let generator = GeminiSignalGenerator::new(None, "fa");
        let signal = generator.generate(&request()).await;
        assert_eq!(signal.direction, Direction::Neutral);
        assert_eq!(signal.confidence, 10);
        assert_eq!(signal.symbol, "XAUUSD");
    }

    #[test]
    fn test_prompt_includes_request_context() {
        let generator = GeminiSignalGenerator::new(None, "en");
        let prompt = generator.build_prompt(&request()).unwrap();
        assert!(prompt.contains("Symbol: XAUUSD (metals)"));
        assert!(prompt.contains("looking for a pullback entry"));
        assert!(prompt.contains("(no related news found)"));
        assert!(prompt.contains("\"stopLoss\""));
        assert!(prompt.contains("in English"));
    }
}
