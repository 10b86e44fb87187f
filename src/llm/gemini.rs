use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{LanguageModel, ModelError, ModelRequest};
use crate::config::LlmConfig;

/// Google Gemini `generateContent` client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
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
    Image { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        temperature: f32,
    ) -> Self {
        let model = model.into();
        // Accept "gemini/<model>" routing-style names
        let model = model
            .strip_prefix("gemini/")
            .map(str::to_string)
            .unwrap_or(model);

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            temperature,
        }
    }

    /// Build a client for `model`, reading the key from the configured environment variable
    pub fn from_config(config: &LlmConfig, model: &str) -> Result<Self, ModelError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ModelError::MissingApiKey(config.api_key_env.clone()))?;

        Ok(Self::new(
            api_key,
            model,
            config.base_url.clone(),
            config.temperature,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_body(&self, request: ModelRequest) -> GenerateRequest {
        let mut parts = vec![Part::Text {
            text: request.prompt,
        }];
        if let Some(data) = request.image_base64 {
            parts.push(Part::Image {
                inline_data: InlineData {
                    mime_type: "image/png",
                    data,
                },
            });
        }

        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn invoke(&self, request: ModelRequest) -> Result<String, ModelError> {
        let has_image = request.image_base64.is_some();
        let body = self.build_body(request);

        debug!(
            "Sending request to Gemini model {} (image: {})",
            self.model, has_image
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("Gemini API error: {} - {}", status, text);
            return Err(ModelError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| ModelError::InvalidResponse(format!("malformed body: {}", e)))?;

        let reply: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| ModelError::InvalidResponse("no candidates in response".to_string()))?;

        if reply.trim().is_empty() {
            return Err(ModelError::InvalidResponse(
                "candidate contains no text".to_string(),
            ));
        }

        Ok(reply)
    }
}
