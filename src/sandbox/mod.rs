//! Execution of generated chart code
//!
//! Generated code is untrusted and often wrong. This module is the single
//! boundary that absorbs those failures: [`execute_and_extract`] and
//! [`execute_for_render`] always return a usable artifact, substituting a
//! diagnostic payload or the built-in placeholder chart when the snippet,
//! the interpreter or image export fails.

mod placeholder;
mod python;

pub use placeholder::{placeholder_figure, PLACEHOLDER_TITLE};
pub use python::PythonRuntime;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::warn;

use crate::config::ReportConfig;
use crate::error::Result;

/// Diagnostic text used when execution leaves no chart object behind
pub const NO_FIGURE_MESSAGE: &str = "No Plotly Figure found";

/// Theme and size applied to charts before they are embedded in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartStyle {
    pub template: String,
    pub width: u32,
    pub height: u32,
}

impl ChartStyle {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            template: config.chart_template.clone(),
            width: config.chart_width,
            height: config.chart_height,
        }
    }
}

/// Result of running a snippet and scanning its namespace for a chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractOutcome {
    Image { png_base64: String },
    ExecutionFailed { error: String },
    NoFigure,
    ExportFailed { error: String },
}

/// Result of running a snippet and looking up its `fig` binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderOutcome {
    Figure {
        figure: Value,
        #[serde(default)]
        title: Option<String>,
    },
    Missing {
        error: String,
    },
}

/// Executes chart code against a dataset.
///
/// Implementations report snippet-level failures through the outcome enums.
/// An `Err` means the runtime itself could not run the snippet (missing
/// interpreter, timeout, broken protocol).
#[async_trait]
pub trait ChartRuntime: Send + Sync {
    /// Run `code` with the dataset bound to `data` and return the first chart found
    async fn extract(&self, code: &str, dataset_path: &Path) -> Result<ExtractOutcome>;

    /// Run `code`, take the chart bound to `fig` and apply `style`
    async fn render(
        &self,
        code: &str,
        dataset_path: &Path,
        style: &ChartStyle,
    ) -> Result<RenderOutcome>;
}

/// A code snippet paired with its rendered image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedFigure {
    pub code: String,
    /// Base64 PNG, or base64 diagnostic text when `diagnostic` is set
    pub image_base64: String,
    #[serde(default)]
    pub diagnostic: bool,
}

impl RenderedFigure {
    fn diagnostic(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            image_base64: STANDARD.encode(message.as_bytes()),
            diagnostic: true,
        }
    }

    /// Decoded diagnostic text, if this figure is a diagnostic
    pub fn diagnostic_message(&self) -> Option<String> {
        if !self.diagnostic {
            return None;
        }
        STANDARD
            .decode(&self.image_base64)
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Execute a snippet and capture its chart as a base64 PNG. Never fails.
pub async fn execute_and_extract(
    runtime: &dyn ChartRuntime,
    code: &str,
    dataset_path: &Path,
) -> RenderedFigure {
    let outcome = match runtime.extract(code, dataset_path).await {
        Ok(outcome) => outcome,
        Err(e) => ExtractOutcome::ExecutionFailed {
            error: e.to_string(),
        },
    };

    match outcome {
        ExtractOutcome::Image { png_base64 } => RenderedFigure {
            code: code.to_string(),
            image_base64: png_base64,
            diagnostic: false,
        },
        ExtractOutcome::ExecutionFailed { error } => {
            warn!("Chart code failed to execute: {}", error);
            RenderedFigure::diagnostic(code, &format!("Code execution failed: {}", error))
        }
        ExtractOutcome::NoFigure => {
            warn!("Chart code produced no figure");
            RenderedFigure::diagnostic(code, NO_FIGURE_MESSAGE)
        }
        ExtractOutcome::ExportFailed { error } => {
            warn!("Figure image export failed: {}", error);
            RenderedFigure::diagnostic(code, &format!("Image export failed: {}", error))
        }
    }
}

/// A chart ready to embed in the report
#[derive(Debug, Clone, PartialEq)]
pub struct ChartFigure {
    /// Plotly figure JSON (`data` and `layout`)
    pub figure: Value,
    pub title: Option<String>,
    pub placeholder: bool,
}

/// Re-execute a snippet for the report, falling back to the placeholder chart. Never fails.
pub async fn execute_for_render(
    runtime: &dyn ChartRuntime,
    code: &str,
    dataset_path: &Path,
    style: &ChartStyle,
) -> ChartFigure {
    let reason = match runtime.render(code, dataset_path, style).await {
        Ok(RenderOutcome::Figure { figure, title }) => {
            return ChartFigure {
                figure,
                title: title.filter(|t| !t.trim().is_empty()),
                placeholder: false,
            }
        }
        Ok(RenderOutcome::Missing { error }) => error,
        Err(e) => e.to_string(),
    };

    warn!("Using placeholder chart: {}", reason);
    ChartFigure {
        figure: placeholder_figure(style),
        title: Some(PLACEHOLDER_TITLE.to_string()),
        placeholder: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataStoryError;

    struct FixedRuntime {
        extract: fn() -> Result<ExtractOutcome>,
        render: fn() -> Result<RenderOutcome>,
    }

    #[async_trait]
    impl ChartRuntime for FixedRuntime {
        async fn extract(&self, _code: &str, _dataset_path: &Path) -> Result<ExtractOutcome> {
            (self.extract)()
        }

        async fn render(
            &self,
            _code: &str,
            _dataset_path: &Path,
            _style: &ChartStyle,
        ) -> Result<RenderOutcome> {
            (self.render)()
        }
    }

    fn style() -> ChartStyle {
        ChartStyle {
            template: "plotly_dark".to_string(),
            width: 600,
            height: 400,
        }
    }

    fn runtime(
        extract: fn() -> Result<ExtractOutcome>,
        render: fn() -> Result<RenderOutcome>,
    ) -> FixedRuntime {
        FixedRuntime { extract, render }
    }

    fn missing() -> Result<RenderOutcome> {
        Ok(RenderOutcome::Missing {
            error: "No 'fig' object found in executed code.".to_string(),
        })
    }

    #[tokio::test]
    async fn test_image_passes_through() {
        let rt = runtime(
            || {
                Ok(ExtractOutcome::Image {
                    png_base64: "iVBORw0KGgo=".to_string(),
                })
            },
            missing,
        );
        let fig = execute_and_extract(&rt, "fig = px.bar()", Path::new("d.csv")).await;
        assert!(!fig.diagnostic);
        assert_eq!(fig.image_base64, "iVBORw0KGgo=");
        assert_eq!(fig.code, "fig = px.bar()");
    }

    #[tokio::test]
    async fn test_execution_failure_is_diagnostic() {
        let rt = runtime(
            || {
                Ok(ExtractOutcome::ExecutionFailed {
                    error: "name 'foo' is not defined".to_string(),
                })
            },
            missing,
        );
        let fig = execute_and_extract(&rt, "foo()", Path::new("d.csv")).await;
        assert!(fig.diagnostic);
        assert!(!fig.image_base64.is_empty());
        assert_eq!(
            fig.diagnostic_message().as_deref(),
            Some("Code execution failed: name 'foo' is not defined")
        );
    }

    #[tokio::test]
    async fn test_no_figure_payload() {
        let rt = runtime(|| Ok(ExtractOutcome::NoFigure), missing);
        let fig = execute_and_extract(&rt, "x = 1", Path::new("d.csv")).await;
        assert_eq!(fig.diagnostic_message().as_deref(), Some(NO_FIGURE_MESSAGE));
        assert_eq!(fig.image_base64, STANDARD.encode(NO_FIGURE_MESSAGE));
    }

    #[tokio::test]
    async fn test_export_failure_is_diagnostic() {
        let rt = runtime(
            || {
                Ok(ExtractOutcome::ExportFailed {
                    error: "kaleido missing".to_string(),
                })
            },
            missing,
        );
        let fig = execute_and_extract(&rt, "fig = go.Figure()", Path::new("d.csv")).await;
        assert_eq!(
            fig.diagnostic_message().as_deref(),
            Some("Image export failed: kaleido missing")
        );
    }

    #[tokio::test]
    async fn test_runtime_error_is_absorbed() {
        let rt = runtime(
            || Err(DataStoryError::Execution("timed out after 1s".to_string())),
            || Err(DataStoryError::Execution("timed out after 1s".to_string())),
        );
        let fig = execute_and_extract(&rt, "while True: pass", Path::new("d.csv")).await;
        assert!(fig.diagnostic);
        assert!(fig
            .diagnostic_message()
            .unwrap()
            .starts_with("Code execution failed:"));

        let chart = execute_for_render(&rt, "while True: pass", Path::new("d.csv"), &style()).await;
        assert!(chart.placeholder);
    }

    #[tokio::test]
    async fn test_render_missing_fig_uses_placeholder() {
        let rt = runtime(|| Ok(ExtractOutcome::NoFigure), missing);
        let chart = execute_for_render(&rt, "fig = None", Path::new("d.csv"), &style()).await;
        assert!(chart.placeholder);
        assert_eq!(chart.title.as_deref(), Some(PLACEHOLDER_TITLE));
        assert_eq!(chart.figure["layout"]["width"], 600);
    }

    #[tokio::test]
    async fn test_render_figure_passes_through() {
        let rt = runtime(
            || Ok(ExtractOutcome::NoFigure),
            || {
                Ok(RenderOutcome::Figure {
                    figure: serde_json::json!({"data": [], "layout": {}}),
                    title: Some("  ".to_string()),
                })
            },
        );
        let chart = execute_for_render(&rt, "fig = go.Figure()", Path::new("d.csv"), &style()).await;
        assert!(!chart.placeholder);
        assert!(chart.title.is_none());
    }

    #[test]
    fn test_outcome_wire_format() {
        let outcome: ExtractOutcome =
            serde_json::from_str(r#"{"status": "image", "png_base64": "abc"}"#).unwrap();
        assert_eq!(
            outcome,
            ExtractOutcome::Image {
                png_base64: "abc".to_string()
            }
        );

        let outcome: RenderOutcome =
            serde_json::from_str(r#"{"status": "figure", "figure": {}, "title": null}"#).unwrap();
        assert!(matches!(outcome, RenderOutcome::Figure { title: None, .. }));
    }
}
