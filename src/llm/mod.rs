//! Language model capability
//!
//! Every model-driven stage talks to the model through [`LanguageModel`]:
//! a prompt, optionally with an inline PNG, goes in and text or an error
//! comes out. Nothing above this seam knows which provider is in use.

mod gemini;
mod parse;

pub use gemini::GeminiClient;
pub use parse::{parse_json_reply, strip_code_fence};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::LlmConfig;

/// Errors from the model client
#[derive(Error, Debug)]
pub enum ModelError {
    /// API key environment variable is unset or empty
    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),

    /// Transport-level failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the API
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Provider name is not supported
    #[error("Unsupported model provider: {0}")]
    UnsupportedProvider(String),
}

/// One model call
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub prompt: String,
    /// Base64-encoded PNG sent inline with the prompt
    pub image_base64: Option<String>,
}

impl ModelRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image_base64: None,
        }
    }

    pub fn with_image(prompt: impl Into<String>, image_base64: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image_base64: Some(image_base64.into()),
        }
    }
}

/// External text or multimodal model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn invoke(&self, request: ModelRequest) -> Result<String, ModelError>;
}

/// Shared handle to a model implementation
pub type SharedModel = Arc<dyn LanguageModel>;

/// Build a client for the configured provider and model name
pub fn from_config(config: &LlmConfig, model: &str) -> Result<SharedModel, ModelError> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiClient::from_config(config, model)?)),
        other => Err(ModelError::UnsupportedProvider(other.to_string())),
    }
}
