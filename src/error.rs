use std::path::PathBuf;
use thiserror::Error;

use crate::llm::ModelError;

/// Main error type for datastory
#[derive(Error, Debug)]
pub enum DataStoryError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Dataset could not be read or parsed
    #[error("Failed to load dataset {path}: {message}")]
    DataLoad { path: PathBuf, message: String },

    /// Dataset parsed but holds no rows
    #[error("Dataset is empty: {path}")]
    EmptyDataset { path: PathBuf },

    /// Report template file is missing
    #[error("Template file not found: {path}")]
    TemplateNotFound { path: PathBuf },

    /// A stage produced output that does not satisfy its contract
    #[error("{stage} stage returned invalid output: {message}")]
    StageValidation {
        stage: &'static str,
        message: String,
    },

    /// External model call failed
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Chart runtime could not run a snippet at all
    #[error("Chart runtime error: {0}")]
    Execution(String),

    /// Worker task failed or was cancelled
    #[error("Worker error: {0}")]
    Worker(String),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },
}

impl DataStoryError {
    pub(crate) fn stage(stage: &'static str, message: impl Into<String>) -> Self {
        Self::StageValidation {
            stage,
            message: message.into(),
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for datastory operations
pub type Result<T> = std::result::Result<T, DataStoryError>;
