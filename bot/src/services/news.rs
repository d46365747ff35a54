//! Headline aggregation and impact scoring for one symbol.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use shared::Config;
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use super::gemini::GeminiService;

const NEWSAPI_URL: &str = "https://newsapi.org/v2/everything";
const GOOGLE_CSE_URL: &str = "https://www.googleapis.com/customsearch/v1";
const NEWSAPI_PAGE_SIZE: usize = 7;
const GOOGLE_CSE_RESULTS: usize = 5;
const MAX_HEADLINES: usize = 10;
const MAX_REASONS: usize = 5;
const MAX_SUMMARY: usize = 6;
const DEFAULT_SCORE: u8 = 5;

static JSON_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsDigest {
    pub headlines: Vec<String>,
    /// 1-10
    pub score: u8,
    pub reasons: Vec<String>,
    pub summary: Vec<String>,
}

impl Default for NewsDigest {
    fn default() -> Self {
        Self {
            headlines: Vec::new(),
            score: DEFAULT_SCORE,
            reasons: Vec::new(),
            summary: Vec::new(),
        }
    }
}

impl NewsDigest {
    /// Text block for the signal prompt. Empty when there are no headlines.
    pub fn prompt_block(&self) -> String {
        if self.headlines.is_empty() {
            return String::new();
        }
        let mut block = self
            .headlines
            .iter()
            .map(|h| format!("- {}", h))
            .collect::<Vec<_>>()
            .join("\n");
        block.push_str(&format!("\nImpact score: {}/10", self.score));
        if !self.reasons.is_empty() {
            block.push_str(&format!("\nReasons: {}", self.reasons.join("; ")));
        }
        block
    }
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    articles: Vec<Titled>,
}

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<Titled>,
}

#[derive(Debug, Deserialize)]
struct Titled {
    title: Option<String>,
}

pub struct NewsAggregator {
    client: reqwest::Client,
    newsapi_key: Option<String>,
    cse: Option<(String, String)>,
    gemini: Option<GeminiService>,
}

impl NewsAggregator {
    pub fn new(config: &Config, gemini: Option<GeminiService>) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.gemini_timeout_secs))
            .build()?;
        let cse = config.google_cse_key.clone().zip(config.google_cse_cx.clone());
        Ok(Self {
            client,
            newsapi_key: config.newsapi_key.clone(),
            cse,
            gemini,
        })
    }

    /// Sources that fail are skipped; the digest is never an error.
    pub async fn fetch(&self, symbol: &str) -> NewsDigest {
        let query = symbol_to_query(symbol);
        let mut headlines = Vec::new();

        if let Some(key) = &self.newsapi_key {
            match self.fetch_newsapi(key, &query).await {
                Ok(titles) => headlines.extend(titles),
                Err(e) => warn!("NewsAPI lookup for {} failed: {}", symbol, e),
            }
        }
        if let Some((key, cx)) = &self.cse {
            match self.fetch_cse(key, cx, &query).await {
                Ok(titles) => headlines.extend(titles),
                Err(e) => warn!("Google CSE lookup for {} failed: {}", symbol, e),
            }
        }

        let headlines = dedup_headlines(headlines);
        debug!("Collected {} headlines for {}", headlines.len(), symbol);
        let mut digest = NewsDigest {
            headlines,
            ..Default::default()
        };
        if digest.headlines.is_empty() {
            return digest;
        }
        if let Some(gemini) = &self.gemini {
            match gemini.ask_question(&scoring_prompt(&digest.headlines)).await {
                Ok(reply) => apply_scoring(&mut digest, &reply),
                Err(e) => warn!("News scoring for {} failed: {}", symbol, e),
            }
        }
        digest
    }

    async fn fetch_newsapi(&self, key: &str, query: &str) -> Result<Vec<String>, anyhow::Error> {
        let page_size = NEWSAPI_PAGE_SIZE.to_string();
        let response: NewsApiResponse = self
            .client
            .get(NEWSAPI_URL)
            .header("X-Api-Key", key)
            .query(&[
                ("q", query),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.articles.into_iter().filter_map(|a| a.title).collect())
    }

    async fn fetch_cse(&self, key: &str, cx: &str, query: &str) -> Result<Vec<String>, anyhow::Error> {
        let num = GOOGLE_CSE_RESULTS.to_string();
        let response: CseResponse = self
            .client
            .get(GOOGLE_CSE_URL)
            .query(&[("key", key), ("cx", cx), ("q", query), ("num", num.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.items.into_iter().filter_map(|i| i.title).collect())
    }
}

pub fn symbol_to_query(symbol: &str) -> String {
    let s = symbol.trim().to_uppercase();
    if s.contains("USDT") {
        return format!("{} crypto market news", s.replace("USDT", ""));
    }
    match s.as_str() {
        "XAUUSD" => "gold price news forex".to_string(),
        "XAGUSD" => "silver price news forex".to_string(),
        "US30" => "Dow Jones futures news".to_string(),
        "NAS100" => "Nasdaq 100 futures news".to_string(),
        "SPX500" => "S&P 500 futures news".to_string(),
        _ if s.len() == 6 && s.is_ascii() => format!("{}/{} forex news", &s[..3], &s[3..]),
        _ => format!("{} market news", s),
    }
}

/// First occurrence wins; capped at `MAX_HEADLINES`.
fn dedup_headlines(headlines: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    headlines
        .into_iter()
        .filter(|h| !h.trim().is_empty())
        .filter(|h| seen.insert(h.clone()))
        .take(MAX_HEADLINES)
        .collect()
}

fn scoring_prompt(headlines: &[String]) -> String {
    let mut prompt = String::from(
        "You are a news analyst.\n\
         Score how much these crypto/forex headlines matter for the short-term market, from 1 to 10.\n\
         Reply with JSON only, keys: score (1-10), reasons (short array), summary (array of headline summaries).\n\
         Headlines:\n",
    );
    for (i, headline) in headlines.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, headline));
    }
    prompt
}

pub(crate) fn extract_json(text: &str) -> &str {
    JSON_OBJECT.find(text).map(|m| m.as_str()).unwrap_or("{}")
}

fn apply_scoring(digest: &mut NewsDigest, reply: &str) {
    let Ok(parsed) = serde_json::from_str::<Value>(extract_json(reply)) else {
        debug!("News scoring reply was not JSON");
        return;
    };
    if let Some(score) = parsed.get("score").and_then(number_of) {
        digest.score = clamp_score(score);
    }
    digest.reasons = string_list(parsed.get("reasons"), MAX_REASONS);
    digest.summary = string_list(parsed.get("summary"), MAX_SUMMARY);
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn clamp_score(score: f64) -> u8 {
    if !score.is_finite() {
        return DEFAULT_SCORE;
    }
    score.round().clamp(1.0, 10.0) as u8
}

fn string_list(value: Option<&Value>, limit: usize) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_to_query() {
        assert_eq!(symbol_to_query("btcusdt"), "BTC crypto market news");
        assert_eq!(symbol_to_query("XAUUSD"), "gold price news forex");
        assert_eq!(symbol_to_query("NAS100"), "Nasdaq 100 futures news");
        assert_eq!(symbol_to_query("EURUSD"), "EUR/USD forex news");
    }

    #[test]
    fn test_dedup_keeps_first_and_caps() {
        let mut headlines: Vec<String> = (0..15).map(|i| format!("h{}", i)).collect();
        headlines.insert(1, "h0".to_string());
        let deduped = dedup_headlines(headlines);
        assert_eq!(deduped.len(), MAX_HEADLINES);
        assert_eq!(deduped[0], "h0");
        assert_eq!(deduped[1], "h1");
    }

    #[test]
    fn test_scoring_reply_is_clamped_and_trimmed() {
        let mut digest = NewsDigest {
            headlines: vec!["Fed holds rates".to_string()],
            ..Default::default()
        };
        let reply = r#"Sure! ```json
{"score": 14.2, "reasons": ["a","b","c","d","e","f"], "summary": ["s1"]}
```"#;
        apply_scoring(&mut digest, reply);
        assert_eq!(digest.score, 10);
        assert_eq!(digest.reasons.len(), MAX_REASONS);
        assert_eq!(digest.summary, vec!["s1"]);
    }

    #[test]
    fn test_unparseable_scoring_keeps_default() {
        let mut digest = NewsDigest::default();
        apply_scoring(&mut digest, "no json here");
        assert_eq!(digest.score, DEFAULT_SCORE);
        assert!(digest.reasons.is_empty());
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(0.0), 1);
        assert_eq!(clamp_score(6.6), 7);
        assert_eq!(clamp_score(f64::NAN), DEFAULT_SCORE);
    }

    #[test]
    fn test_prompt_block() {
        assert_eq!(NewsDigest::default().prompt_block(), "");
        let digest = NewsDigest {
            headlines: vec!["Gold rallies".to_string()],
            score: 8,
            reasons: vec!["safe haven demand".to_string()],
            summary: Vec::new(),
        };
        assert_eq!(
            digest.prompt_block(),
            "- Gold rallies\nImpact score: 8/10\nReasons: safe haven demand"
        );
    }
}
