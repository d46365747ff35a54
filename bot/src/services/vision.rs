use async_trait::async_trait;
use shared::ChartImage;
use tracing::warn;

use super::gemini::GeminiService;

/// Turns a chart screenshot into a short technical summary.
#[async_trait]
pub trait VisionSummarizer: Send + Sync {
    /// Empty string when nothing useful could be extracted.
    async fn summarize(&self, image: &ChartImage, symbol: &str) -> String;
}

pub struct GeminiVision {
    gemini: Option<GeminiService>,
    language: &'static str,
}

impl GeminiVision {
    pub fn new(gemini: Option<GeminiService>, locale: &str) -> Self {
        Self {
            gemini,
            language: super::language_name(locale),
        }
    }

    fn instruction(&self, symbol: &str) -> String {
        format!(
            "You analyze trading charts. The image is a chart of {}. Reply in {} with a compact \
             bullet list: trend, structure, key levels, patterns, indicators if visible.",
            symbol, self.language
        )
    }
}

#[async_trait]
impl VisionSummarizer for GeminiVision {
    async fn summarize(&self, image: &ChartImage, symbol: &str) -> String {
        let Some(gemini) = &self.gemini else {
            return String::new();
        };
        let instruction = self.instruction(symbol);
        match gemini.describe_image(&instruction, image).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Chart analysis for {} failed: {}", symbol, e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_follows_locale() {
        let english = GeminiVision::new(None, "en").instruction("XAUUSD");
        assert!(english.contains("chart of XAUUSD"));
        assert!(english.contains("Reply in English"));

        let persian = GeminiVision::new(None, "fa").instruction("XAUUSD");
        assert!(persian.contains("Reply in Persian"));
    }

    #[tokio::test]
    async fn test_without_provider_returns_empty_summary() {
        let vision = GeminiVision::new(None, "en");
        let image = ChartImage {
            mime: "image/png".to_string(),
            data: vec![1, 2, 3],
        };
        assert_eq!(vision.summarize(&image, "XAUUSD").await, "");
    }
}
