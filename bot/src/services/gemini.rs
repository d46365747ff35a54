//! Gemini `generateContent` client shared by the vision, news and signal
//! services.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use shared::{ChartImage, Config};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GeminiService {
    api_key: String,
    model_name: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiService {
    pub fn with_config(
        api_key: String,
        model_name: String,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            api_key,
            model_name,
            base_url,
            client,
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, anyhow::Error> {
        let Some(api_key) = config.gemini_api_key.clone() else {
            return Ok(None);
        };
        Self::with_config(
            api_key,
            config.gemini_model_name.clone(),
            config.gemini_base_url.clone(),
            config.gemini_timeout_secs,
        )
        .map(Some)
    }

    fn build_api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model_name,
            self.api_key
        )
    }

    pub async fn ask_question(&self, question: &str) -> Result<String, anyhow::Error> {
        self.generate(vec![Part::Text {
            text: question.to_string(),
        }])
        .await
    }

    /// Send an instruction together with an image.
    pub async fn describe_image(&self, instruction: &str, image: &ChartImage) -> Result<String, anyhow::Error> {
        self.generate(vec![
            Part::Text {
                text: instruction.to_string(),
            },
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime.clone(),
                    data: STANDARD.encode(&image.data),
                },
            },
        ])
        .await
    }

    async fn generate(&self, parts: Vec<Part>) -> Result<String, anyhow::Error> {
        let request = GeminiRequest {
            contents: vec![Content { role: "user", parts }],
            generation_config: GenerationConfig { temperature: 0.2 },
        };

        let response = self
            .client
            .post(self.build_api_url())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!("Gemini API error ({}): {}", status, error_text));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow::anyhow!("No response from Gemini API"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_part_serializes_as_inline_data() {
        let part = Part::InlineData {
            inline_data: InlineData {
                mime_type: "image/png".to_string(),
                data: STANDARD.encode([1u8, 2, 3]),
            },
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["inline_data"]["mime_type"], "image/png");
        assert_eq!(json["inline_data"]["data"], "AQID");
    }

    #[test]
    fn test_api_url_trims_trailing_slash() {
        let service = GeminiService::with_config(
            "k".to_string(),
            "gemini-1.5-flash".to_string(),
            "https://example.test/v1beta/".to_string(),
            5,
        )
        .unwrap();
        assert_eq!(
            service.build_api_url(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent?key=k"
        );
    }
}
