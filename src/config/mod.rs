//! Configuration management for datastory
//!
//! Every component receives the pieces of this structure it needs at
//! construction time; nothing reads configuration from global state.

use crate::error::{DataStoryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

/// Instruction sent alongside every chart image to the multimodal model
pub const DEFAULT_INSIGHTS_PROMPT: &str = "Turn this graph into a short narrative of insights. \
Highlight only the most impactful trends, patterns, and anomalies, showing what they mean rather \
than just describing numbers. Each insight should feel like a mini-story with technical clarity, \
concise wording, and clear implications. Keep it simple, actionable, and under 100 words, \
focusing on meaning over detail. Write the insights directly without introductions or filler.";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub llm: LlmConfig,
    pub insights: InsightsConfig,
    pub themes: ThemesConfig,
    pub execution: ExecutionConfig,
    pub report: ReportConfig,
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Text model used for recommendations and code generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub api_key_env: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

/// Multimodal narration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    pub model: String,
    pub prompt: String,
    /// Wait observed before every narration request
    pub pacing_delay: String,
    pub retry_enabled: bool,
    pub max_retries: u32,
    pub retry_delay: String,
}

/// Plot styling directives handed to the code generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemesConfig {
    pub light_directive: String,
    pub dark_directive: String,
}

/// Child interpreter used to run generated chart code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub interpreter: String,
    pub timeout: String,
    /// Import statements seeded into the execution namespace, e.g. "pandas as pd"
    pub preload: Vec<String>,
    /// Directories prepended to PYTHONPATH for the child interpreter
    #[serde(default)]
    pub python_path: Vec<PathBuf>,
}

/// Report assembly settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub light_template: PathBuf,
    pub dark_template: PathBuf,
    pub block_template: PathBuf,
    pub output_file: PathBuf,
    pub chart_template: String,
    pub chart_width: u32,
    pub chart_height: u32,
    pub plotly_cdn: String,
}

/// Dataset profiling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Attach every row to the profile sent to the recommender
    pub include_full_data: bool,
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pacing_delay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DataStoryError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| DataStoryError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| DataStoryError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self.profiles.get(profile).cloned().ok_or_else(|| {
            DataStoryError::Config(format!("Unknown configuration profile: {}", profile))
        })?;

        if let Some(delay) = overrides.pacing_delay {
            self.insights.pacing_delay = delay;
        }
        if let Some(enabled) = overrides.retry_enabled {
            self.insights.retry_enabled = enabled;
        }
        if let Some(model) = overrides.model {
            self.llm.model = model.clone();
            self.insights.model = model;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: DATASTORY_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("DATASTORY_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "LLM__MODEL" => {
                self.llm.model = value.to_string();
            }
            "LLM__API_KEY_ENV" => {
                self.llm.api_key_env = value.to_string();
            }
            "LLM__BASE_URL" => {
                self.llm.base_url = value.to_string();
            }
            "INSIGHTS__MODEL" => {
                self.insights.model = value.to_string();
            }
            "INSIGHTS__PACING_DELAY" => {
                self.insights.pacing_delay = value.to_string();
            }
            "INSIGHTS__RETRY_ENABLED" => {
                self.insights.retry_enabled =
                    value.parse().map_err(|_| DataStoryError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Cannot parse '{}' as boolean", value),
                    })?;
            }
            "INSIGHTS__MAX_RETRIES" => {
                self.insights.max_retries =
                    value.parse().map_err(|_| DataStoryError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Cannot parse '{}' as integer", value),
                    })?;
            }
            "EXECUTION__INTERPRETER" => {
                self.execution.interpreter = value.to_string();
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Pick the styling directive for generated code
    pub fn theme_directive(&self, dark: bool) -> &str {
        if dark {
            &self.themes.dark_directive
        } else {
            &self.themes.light_directive
        }
    }

    /// Pick the report wrapper template
    pub fn wrapper_template(&self, dark: bool) -> &Path {
        if dark {
            &self.report.dark_template
        } else {
            &self.report.light_template
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            DataStoryError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("datastory").join("config.toml"))
    }
}

impl InsightsConfig {
    pub fn pacing_delay(&self) -> Duration {
        parse_duration(&self.pacing_delay).unwrap_or(Duration::from_secs(15))
    }

    pub fn retry_delay(&self) -> Duration {
        parse_duration(&self.retry_delay).unwrap_or(Duration::from_secs(30))
    }
}

impl ExecutionConfig {
    pub fn timeout(&self) -> Duration {
        parse_duration(&self.timeout).unwrap_or(Duration::from_secs(120))
    }
}

/// Parse a duration string such as "500ms", "15s", "2m" or "1h".
/// A bare number is read as seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();

    // Check "ms" before "s" because "ms" ends with "s"
    if let Some(ms) = value.strip_suffix("ms") {
        ms.trim().parse().ok().map(Duration::from_millis)
    } else if let Some(secs) = value.strip_suffix('s') {
        secs.trim().parse().ok().map(Duration::from_secs)
    } else if let Some(mins) = value.strip_suffix('m') {
        mins.trim().parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else if let Some(hours) = value.strip_suffix('h') {
        hours
            .trim()
            .parse::<u64>()
            .ok()
            .map(|h| Duration::from_secs(h * 3600))
    } else {
        value.parse().ok().map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        let templates = PathBuf::from("./templates");

        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            llm: LlmConfig {
                provider: "gemini".to_string(),
                api_key_env: "GEMINI_API_KEY".to_string(),
                model: "gemini-2.0-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                temperature: 0.2,
            },
            insights: InsightsConfig {
                model: "gemini-2.0-flash".to_string(),
                prompt: DEFAULT_INSIGHTS_PROMPT.to_string(),
                pacing_delay: "15s".to_string(),
                retry_enabled: false,
                max_retries: 3,
                retry_delay: "30s".to_string(),
            },
            themes: ThemesConfig {
                light_directive: "use plotly light theme for all plots".to_string(),
                dark_directive: "use plotly dark theme for all plots".to_string(),
            },
            execution: ExecutionConfig {
                interpreter: "python3".to_string(),
                timeout: "120s".to_string(),
                preload: vec![
                    "pandas as pd".to_string(),
                    "plotly.express as px".to_string(),
                    "plotly.graph_objects as go".to_string(),
                    "numpy as np".to_string(),
                    "datetime".to_string(),
                ],
                python_path: Vec::new(),
            },
            report: ReportConfig {
                light_template: templates.join("report_light_theme.html"),
                dark_template: templates.join("report_dark_theme.html"),
                block_template: templates.join("page_block.html"),
                output_file: PathBuf::from("styled_report.html"),
                chart_template: "plotly_dark".to_string(),
                chart_width: 600,
                chart_height: 400,
                plotly_cdn: "https://cdn.plot.ly/plotly-2.35.2.min.js".to_string(),
            },
            dataset: DatasetConfig {
                include_full_data: false,
            },
            profiles: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("15s"), Some(Duration::from_secs(15)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_duration("soon"), None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.insights.max_retries = 5;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.insights.max_retries, 5);
        assert_eq!(loaded.report.chart_width, 600);
        assert_eq!(loaded.execution.preload.len(), 5);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/datastory.toml"));
        assert!(matches!(result, Err(DataStoryError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_apply_profile() {
        let mut config = Config::default();
        config.profiles.insert(
            "fast".to_string(),
            ProfileOverrides {
                pacing_delay: Some("0s".to_string()),
                retry_enabled: Some(true),
                model: None,
            },
        );

        config.apply_profile("fast").unwrap();
        assert_eq!(config.insights.pacing_delay(), Duration::ZERO);
        assert!(config.insights.retry_enabled);
        assert!(config.apply_profile("missing").is_err());
    }

    #[test]
    fn test_theme_selection() {
        let config = Config::default();
        assert!(config.theme_directive(true).contains("dark"));
        assert!(config.theme_directive(false).contains("light"));
        assert!(config
            .wrapper_template(true)
            .ends_with("report_dark_theme.html"));
    }
}
