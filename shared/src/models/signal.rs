use serde::{Deserialize, Serialize};
use std::fmt;

use super::asset::AssetCategory;

pub const DEFAULT_DISCLAIMER: &str = "This output is educational only and is not financial advice.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    pub mime: String,
    pub data: Vec<u8>,
}

/// Everything a signal generator needs for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalRequest {
    pub user_id: i64,
    pub chat_id: i64,
    pub symbol: String,
    pub category: AssetCategory,
    pub timeframe: String,
    pub style: String,
    pub risk: String,
    pub user_prompt: Option<String>,
    pub chart_image: Option<ChartImage>,
    pub memory_summary: String,
    pub vision_summary: Option<String>,
    pub news_digest: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
    #[default]
    Neutral,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
            Direction::Neutral => "NEUTRAL",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignalOutput {
    pub symbol: String,
    pub timeframe: String,
    pub style: String,
    pub direction: Direction,
    pub entry: String,
    pub stop_loss: String,
    pub take_profits: Vec<String>,
    /// 0-100
    pub confidence: u8,
    pub rationale: Vec<String>,
    pub key_levels: Vec<String>,
    pub news_summary: Vec<String>,
    /// 1-10
    pub news_score: u8,
    pub risk_notes: Vec<String>,
    pub disclaimer: String,
}

impl SignalOutput {
    /// Low-confidence placeholder used when no provider answered.
    pub fn neutral(request: &SignalRequest, reason: &str) -> Self {
        Self {
            symbol: request.symbol.clone(),
            timeframe: request.timeframe.clone(),
            style: request.style.clone(),
            direction: Direction::Neutral,
            entry: "N/A".to_string(),
            stop_loss: "N/A".to_string(),
            confidence: 10,
            rationale: vec![reason.to_string()],
            news_score: 5,
            risk_notes: vec!["Configure a model provider key to enable analysis.".to_string()],
            disclaimer: DEFAULT_DISCLAIMER.to_string(),
            ..Default::default()
        }
    }

    /// One-line summary kept in the user's recent notes.
    pub fn note(&self) -> String {
        format!(
            "{} {} {} (conf {}%) entry {}",
            self.symbol, self.timeframe, self.direction, self.confidence, self.entry
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SignalRequest {
        SignalRequest {
            user_id: 1,
            chat_id: 1,
            symbol: "XAUUSD".to_string(),
            category: AssetCategory::Metals,
            timeframe: "H4".to_string(),
            style: "swing".to_string(),
            risk: "low".to_string(),
            user_prompt: None,
            chart_image: None,
            memory_summary: String::new(),
            vision_summary: None,
            news_digest: None,
        }
    }

    #[test]
    fn test_neutral_signal_note() {
        let signal = SignalOutput::neutral(&request(), "no provider");
        assert_eq!(signal.direction, Direction::Neutral);
        assert_eq!(signal.note(), "XAUUSD H4 NEUTRAL (conf 10%) entry N/A");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let signal: SignalOutput = serde_json::from_str(
            r#"{"symbol":"BTCUSDT","direction":"SELL","stopLoss":"70100","confidence":64}"#,
        )
        .unwrap();
        assert_eq!(signal.direction, Direction::Sell);
        assert_eq!(signal.stop_loss, "70100");
        assert!(signal.take_profits.is_empty());
    }
}
