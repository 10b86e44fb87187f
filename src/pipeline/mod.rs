//! Report generation pipeline
//!
//! Stages run strictly one after another:
//! profile → recommendations → code batches (per tier) → figures and
//! narration (per tier) → aggregation → rendering. Each stage consumes the
//! previous stage's output; the dataset profile is shared context for the
//! recommendation and code generation stages.

mod codegen;
mod narrate;
pub mod prompts;
mod recommend;
mod types;

pub use codegen::CodeGenerator;
pub use narrate::{NarrationPolicy, Narrator};
pub use recommend::Recommender;
pub use types::{
    CodeBatch, CodeInsightPair, FullReportData, RecommendationSet, Tier, TieredInsights,
};

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::dataset::{extract_profile, DatasetProfile};
use crate::error::{DataStoryError, Result};
use crate::llm::{self, SharedModel};
use crate::report::{RenderOptions, ReportRenderer};
use crate::sandbox::{execute_and_extract, ChartRuntime, PythonRuntime};

/// Number of progress milestones reported during one run
pub const MILESTONES: usize = 9;

/// Parameters of one report generation run
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub dataset_path: PathBuf,
    pub target_analysis_count: usize,
    pub report_title: String,
    pub footer_text: String,
    pub output_path: PathBuf,
    pub page_title: String,
    pub dark_theme: bool,
}

/// Wires the stages together for one configuration
pub struct Pipeline {
    config: Config,
    recommender: Recommender,
    generator: CodeGenerator,
    narrator: Narrator,
    runtime: Arc<dyn ChartRuntime>,
    dump_dir: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        text_model: SharedModel,
        insight_model: SharedModel,
        runtime: Arc<dyn ChartRuntime>,
    ) -> Self {
        let policy = NarrationPolicy::from_config(&config.insights);
        Self {
            recommender: Recommender::new(text_model.clone()),
            generator: CodeGenerator::new(text_model),
            narrator: Narrator::new(insight_model, policy),
            runtime,
            config,
            dump_dir: None,
        }
    }

    /// Build the Gemini clients and the Python runtime described by `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let text_model = llm::from_config(&config.llm, &config.llm.model)?;
        let insight_model = llm::from_config(&config.llm, &config.insights.model)?;

        let runtime = PythonRuntime::new(&config.execution);
        if !runtime.is_available() {
            tracing::warn!(
                "Interpreter '{}' not found; every chart will fall back to a placeholder",
                config.execution.interpreter
            );
        }

        Ok(Self::new(config, text_model, insight_model, Arc::new(runtime)))
    }

    /// Write every stage's output as JSON under `dir`
    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    /// Run every stage and write the report, returning its path.
    /// `progress` is called once per completed milestone.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        progress: &(dyn Fn() + Send + Sync),
    ) -> Result<PathBuf> {
        let dataset_path = request.dataset_path.as_path();

        let profile = extract_profile(dataset_path, self.config.dataset.include_full_data)?;
        info!(
            "Profiled dataset: {} rows, {} columns",
            profile.summary.num_rows, profile.summary.num_columns
        );
        self.dump("profile.json", &profile)?;
        progress();

        let recommendations = self
            .recommender
            .recommend(&profile, request.target_analysis_count)
            .await?;
        self.dump("recommendations.json", &recommendations)?;
        progress();

        let simple_codes = self
            .code_stage(Tier::Simple, &recommendations, &profile, request)
            .await?;
        progress();
        let intermediate_codes = self
            .code_stage(Tier::Intermediate, &recommendations, &profile, request)
            .await?;
        progress();
        let advanced_codes = self
            .code_stage(Tier::Advanced, &recommendations, &profile, request)
            .await?;
        progress();

        let simple = self.insight_stage(&simple_codes).await?;
        progress();
        let intermediate = self.insight_stage(&intermediate_codes).await?;
        progress();
        let advanced = self.insight_stage(&advanced_codes).await?;
        progress();

        let data = FullReportData::assemble(simple, intermediate, advanced);
        self.dump("report_data.json", &data)?;
        info!("Assembled {} narrated analyses", data.len());

        let renderer = ReportRenderer::from_config(self.runtime.clone(), &self.config.report);
        let output = renderer
            .render(&data, &self.render_options(request))
            .await?;
        progress();

        Ok(output)
    }

    /// Render options for `request`, with the wrapper chosen by theme
    pub fn render_options(&self, request: &GenerationRequest) -> RenderOptions {
        RenderOptions {
            wrapper_template: self
                .config
                .wrapper_template(request.dark_theme)
                .to_path_buf(),
            block_template: self.config.report.block_template.clone(),
            output_path: request.output_path.clone(),
            dataset_path: request.dataset_path.clone(),
            report_title: request.report_title.clone(),
            page_title: request.page_title.clone(),
            footer_text: request.footer_text.clone(),
        }
    }

    async fn code_stage(
        &self,
        tier: Tier,
        recommendations: &RecommendationSet,
        profile: &DatasetProfile,
        request: &GenerationRequest,
    ) -> Result<CodeBatch> {
        let batch = self
            .generator
            .generate(
                tier,
                recommendations.tier(tier),
                profile,
                &request.dataset_path,
                self.config.theme_directive(request.dark_theme),
            )
            .await?;
        self.dump(&format!("codes_{}.json", tier), &batch)?;
        Ok(batch)
    }

    /// Execute each snippet, then narrate the resulting figures
    async fn insight_stage(&self, batch: &CodeBatch) -> Result<TieredInsights> {
        let mut figures = Vec::with_capacity(batch.codes.len());
        for code in &batch.codes {
            figures.push(execute_and_extract(self.runtime.as_ref(), code, &batch.csv_path).await);
        }

        let insights = self.narrator.narrate_batch(batch.tier, &figures).await;
        self.dump(&format!("insights_{}.json", batch.tier), &insights)?;
        Ok(insights)
    }

    fn dump<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let Some(dir) = &self.dump_dir else {
            return Ok(());
        };
        write_json(&dir.join(name), value)
    }
}

/// Pretty-print `value` as JSON to `path`, creating parent directories
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DataStoryError::Io {
            source: e,
            context: format!("Failed to create directory: {:?}", parent),
        })?;
    }

    let content = serde_json::to_string_pretty(value).map_err(|e| DataStoryError::Json {
        source: e,
        context: format!("Failed to serialize {:?}", path),
    })?;

    std::fs::write(path, content).map_err(|e| DataStoryError::Io {
        source: e,
        context: format!("Failed to write {:?}", path),
    })
}
