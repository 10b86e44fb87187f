use crate::config::{parse_duration, Config};
use crate::error::{DataStoryError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every violation
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_insights(config, &mut errors);
        Self::validate_execution(config, &mut errors);
        Self::validate_report(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DataStoryError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.llm.provider;
        let valid_providers = ["gemini"];
        if !valid_providers.contains(&provider.as_str()) {
            errors.push(ValidationError::new(
                "llm.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    valid_providers, provider
                ),
            ));
        }

        if config.llm.model.is_empty() {
            errors.push(ValidationError::new("llm.model", "Model name cannot be empty"));
        }

        if config.llm.api_key_env.is_empty() {
            errors.push(ValidationError::new(
                "llm.api_key_env",
                "API key environment variable name cannot be empty",
            ));
        }

        let temp = config.llm.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }
    }

    fn validate_insights(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.insights.model.is_empty() {
            errors.push(ValidationError::new(
                "insights.model",
                "Model name cannot be empty",
            ));
        }

        if config.insights.prompt.trim().is_empty() {
            errors.push(ValidationError::new(
                "insights.prompt",
                "Insight prompt cannot be empty",
            ));
        }

        for (path, value) in [
            ("insights.pacing_delay", &config.insights.pacing_delay),
            ("insights.retry_delay", &config.insights.retry_delay),
        ] {
            if parse_duration(value).is_none() {
                errors.push(ValidationError::new(
                    path,
                    format!("Invalid duration format: {}", value),
                ));
            }
        }
    }

    fn validate_execution(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.execution.interpreter.trim().is_empty() {
            errors.push(ValidationError::new(
                "execution.interpreter",
                "Interpreter cannot be empty",
            ));
        }

        match parse_duration(&config.execution.timeout) {
            Some(timeout) if timeout.is_zero() => errors.push(ValidationError::new(
                "execution.timeout",
                "Timeout must be greater than 0",
            )),
            Some(_) => {}
            None => errors.push(ValidationError::new(
                "execution.timeout",
                format!("Invalid duration format: {}", config.execution.timeout),
            )),
        }

        for entry in &config.execution.preload {
            if !Self::is_valid_preload(entry) {
                errors.push(ValidationError::new(
                    "execution.preload",
                    format!("Expected 'module' or 'module as alias', got '{}'", entry),
                ));
            }
        }
    }

    fn validate_report(config: &Config, errors: &mut Vec<ValidationError>) {
        // Template existence is checked at render time, paths may be relative
        // to the directory the report is generated from.
        for (path, value) in [
            ("report.light_template", &config.report.light_template),
            ("report.dark_template", &config.report.dark_template),
            ("report.block_template", &config.report.block_template),
            ("report.output_file", &config.report.output_file),
        ] {
            if value.as_os_str().is_empty() {
                errors.push(ValidationError::new(path, "Path cannot be empty"));
            }
        }

        if config.report.chart_width == 0 || config.report.chart_height == 0 {
            errors.push(ValidationError::new(
                "report.chart_width",
                "Chart dimensions must be greater than 0",
            ));
        }

        if config.report.chart_template.is_empty() {
            errors.push(ValidationError::new(
                "report.chart_template",
                "Chart template cannot be empty",
            ));
        }
    }

    fn is_valid_preload(entry: &str) -> bool {
        let is_ident = |s: &str| {
            !s.is_empty()
                && s.split('.').all(|part| {
                    !part.is_empty()
                        && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                        && !part.starts_with(|c: char| c.is_ascii_digit())
                })
        };

        let parts: Vec<&str> = entry.split_whitespace().collect();
        match parts.as_slice() {
            [module] => is_ident(module),
            [module, "as", alias] => is_ident(module) && is_ident(alias) && !alias.contains('.'),
            _ => false,
        }
    }
}
