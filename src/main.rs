use datastory::cli::{Cli, Commands, ConfigAction};
use datastory::config::{Config, ConfigValidator};
use datastory::dataset::extract_profile;
use datastory::error::{DataStoryError, Result};
use datastory::pipeline::{FullReportData, GenerationRequest, Pipeline, MILESTONES};
use datastory::report::{RenderOptions, ReportRenderer};
use datastory::sandbox::PythonRuntime;
use datastory::worker::{ProgressCallback, ReportWorker, SignalHandler};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const MILESTONE_LABELS: [&str; MILESTONES] = [
    "Dataset profiled",
    "Analyses recommended",
    "Simple code generated",
    "Intermediate code generated",
    "Advanced code generated",
    "Simple insights narrated",
    "Intermediate insights narrated",
    "Advanced insights narrated",
    "Report rendered",
];

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate {
            dataset,
            count,
            title,
            footer,
            output,
            page_title,
            dark,
            profile,
            dump_dir,
        } => {
            let config = load_config(cli.config, profile)?;
            let request = GenerationRequest {
                output_path: output.unwrap_or_else(|| config.report.output_file.clone()),
                dataset_path: dataset,
                target_analysis_count: count,
                report_title: title,
                footer_text: footer,
                page_title,
                dark_theme: dark,
            };
            cmd_generate(config, request, dump_dir)?;
        }
        Commands::Profile { dataset, full } => {
            cmd_profile(&dataset, full)?;
        }
        Commands::Render {
            data,
            dataset,
            output,
            dark,
            title,
            page_title,
            footer,
        } => {
            let config = load_config(cli.config, None)?;
            let options = RenderOptions {
                wrapper_template: config.wrapper_template(dark).to_path_buf(),
                block_template: config.report.block_template.clone(),
                output_path: output.unwrap_or_else(|| config.report.output_file.clone()),
                dataset_path: dataset,
                report_title: title,
                page_title,
                footer_text: footer,
            };
            cmd_render(&config, &data, options)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "datastory=debug"
    } else {
        "datastory=info"
    };
    let filter = EnvFilter::try_from_env("DATASTORY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| DataStoryError::Io {
        source: e,
        context: "Failed to create async runtime".to_string(),
    })
}

fn cmd_generate(config: Config, request: GenerationRequest, dump_dir: Option<PathBuf>) -> Result<()> {
    let mut pipeline = Pipeline::from_config(config)?;
    if let Some(dir) = dump_dir {
        pipeline = pipeline.with_dump_dir(dir);
    }

    let counter = Arc::new(AtomicUsize::new(0));
    let progress: ProgressCallback = {
        let counter = counter.clone();
        Arc::new(move || {
            let done = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let label = MILESTONE_LABELS.get(done - 1).copied().unwrap_or("Done");
            eprintln!("[{}/{}] {}", done, MILESTONES, label);
        })
    };

    let output_path = request.output_path.clone();
    println!("Generating report for {}", request.dataset_path.display());

    let rt = runtime()?;
    let success = rt.block_on(async {
        let mut signals = SignalHandler::new()?;
        let mut handle = ReportWorker::spawn(Arc::new(pipeline), request, Some(progress));

        let interrupted = tokio::select! {
            result = handle.wait() => return result,
            sig = signals.wait() => sig,
        };

        tracing::warn!("Stopping report generation ({})", interrupted);
        handle.stop();
        Err(DataStoryError::Worker(format!(
            "stopped by {} signal",
            interrupted
        )))
    })?;

    if !success {
        return Err(DataStoryError::Worker(
            "report generation failed, see log for details".to_string(),
        ));
    }

    println!("✓ Report saved to: {}", output_path.display());
    Ok(())
}

fn cmd_profile(dataset: &Path, full: bool) -> Result<()> {
    let profile = extract_profile(dataset, full)?;
    println!("{}", profile.to_prompt_json()?);
    Ok(())
}

fn cmd_render(config: &Config, data_path: &Path, options: RenderOptions) -> Result<()> {
    let content = std::fs::read_to_string(data_path).map_err(|e| DataStoryError::Io {
        source: e,
        context: format!("Failed to read report data: {:?}", data_path),
    })?;
    let data: FullReportData = serde_json::from_str(&content).map_err(|e| DataStoryError::Json {
        source: e,
        context: format!("Invalid report data: {:?}", data_path),
    })?;

    let renderer = ReportRenderer::from_config(
        Arc::new(PythonRuntime::new(&config.execution)),
        &config.report,
    );

    let rt = runtime()?;
    let path = rt.block_on(renderer.render(&data, &options))?;

    println!("✓ Rendered {} blocks to: {}", data.len(), path.display());
    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, None)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Model: {} (insights: {})", config.llm.model, config.insights.model);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| DataStoryError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'datastory config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}
