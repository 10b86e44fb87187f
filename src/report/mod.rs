//! HTML report assembly
//!
//! The wrapper template carries `{{blocks}}`, `{{page_title}}` and
//! `{{report_title}}`. The block template is filled once per narrated
//! snippet with `{{title}}`, `{{chart}}`, `{{insights}}`, `{{footer_text}}`,
//! `{{report_title}}`, `{{section}}` and `{{index}}`. Substitution is plain
//! string replacement.

mod chart;
mod markup;

pub use chart::{chart_fragment, chart_id};
pub use markup::{escape_html, insights_to_html};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ReportConfig;
use crate::error::{DataStoryError, Result};
use crate::pipeline::{CodeInsightPair, FullReportData, Tier};
use crate::sandbox::{execute_for_render, ChartRuntime, ChartStyle};

/// Per-report inputs to [`ReportRenderer::render`]
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub wrapper_template: PathBuf,
    pub block_template: PathBuf,
    pub output_path: PathBuf,
    /// Dataset the snippets are re-executed against
    pub dataset_path: PathBuf,
    pub report_title: String,
    pub page_title: String,
    /// Inserted into each block as-is
    pub footer_text: String,
}

/// Renders narrated snippets into the final document
pub struct ReportRenderer {
    runtime: Arc<dyn ChartRuntime>,
    style: ChartStyle,
    plotly_cdn: String,
}

impl ReportRenderer {
    pub fn new(runtime: Arc<dyn ChartRuntime>, style: ChartStyle, plotly_cdn: impl Into<String>) -> Self {
        Self {
            runtime,
            style,
            plotly_cdn: plotly_cdn.into(),
        }
    }

    pub fn from_config(runtime: Arc<dyn ChartRuntime>, config: &ReportConfig) -> Self {
        Self::new(runtime, ChartStyle::from_config(config), config.plotly_cdn.clone())
    }

    /// Render `data` and write the report, returning the output path.
    ///
    /// Missing templates fail before any snippet runs and leave the output
    /// untouched. Snippet failures never fail the render; the block gets the
    /// placeholder chart instead.
    pub async fn render(&self, data: &FullReportData, options: &RenderOptions) -> Result<PathBuf> {
        let wrapper = read_template(&options.wrapper_template).await?;
        let block_template = read_template(&options.block_template).await?;

        let mut blocks = Vec::with_capacity(data.len());
        for (i, (tier, item)) in data.entries().enumerate() {
            let index = i + 1;
            debug!("Rendering block {} ({})", index, tier);
            blocks.push(
                self.render_block(&block_template, tier, item, index, options)
                    .await,
            );
        }

        let document = wrapper
            .replace("{{blocks}}", &blocks.join("\n"))
            .replace("{{page_title}}", &escape_html(&options.page_title))
            .replace("{{report_title}}", &escape_html(&options.report_title));

        if let Some(parent) = options.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| DataStoryError::Io {
                        source: e,
                        context: format!("Failed to create output directory: {:?}", parent),
                    })?;
            }
        }

        tokio::fs::write(&options.output_path, document)
            .await
            .map_err(|e| DataStoryError::Io {
                source: e,
                context: format!("Failed to write report: {:?}", options.output_path),
            })?;

        info!(
            "Report with {} blocks saved to {:?}",
            blocks.len(),
            options.output_path
        );
        Ok(options.output_path.clone())
    }

    async fn render_block(
        &self,
        template: &str,
        tier: Tier,
        item: &CodeInsightPair,
        index: usize,
        options: &RenderOptions,
    ) -> String {
        let chart = execute_for_render(
            self.runtime.as_ref(),
            &item.code,
            &options.dataset_path,
            &self.style,
        )
        .await;

        let title = chart
            .title
            .clone()
            .unwrap_or_else(|| format!("Data Visualization {}", index));

        let substitutions = [
            ("{{title}}", escape_html(&title)),
            (
                "{{chart}}",
                chart_fragment(&chart.figure, index, &self.plotly_cdn),
            ),
            ("{{insights}}", insights_to_html(&item.insights)),
            ("{{footer_text}}", options.footer_text.clone()),
            ("{{report_title}}", escape_html(&options.report_title)),
            ("{{section}}", escape_html(tier.section_label())),
            ("{{index}}", index.to_string()),
        ];

        substitutions
            .iter()
            .fold(template.to_string(), |html, (key, value)| {
                html.replace(key, value)
            })
    }
}

async fn read_template(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(DataStoryError::TemplateNotFound {
            path: path.to_path_buf(),
        });
    }

    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DataStoryError::Io {
            source: e,
            context: format!("Failed to read template: {:?}", path),
        })
}
