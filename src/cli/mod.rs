//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_REPORT_TITLE: &str = "Data Analysis Report";
pub const DEFAULT_PAGE_TITLE: &str = "Dataset Report";
pub const DEFAULT_FOOTER: &str = "Generated by Data Analysis Story Teller";

#[derive(Parser, Debug)]
#[command(
    name = "datastory",
    version,
    author = "neur0map",
    about = "Turn a CSV dataset into an illustrated, narrated HTML report",
    long_about = "Datastory profiles a CSV file, asks a language model for analyses at three \
                  difficulty tiers, generates and runs Plotly code for each one, narrates every \
                  chart with a multimodal model and assembles the results into a themed HTML report."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/datastory/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a full report from a CSV file
    Generate {
        /// Dataset to analyse
        dataset: PathBuf,

        /// Total number of analyses, split evenly across the three tiers
        #[arg(short = 'n', long, default_value = "50")]
        count: usize,

        /// Title shown in the report
        #[arg(short, long, default_value = DEFAULT_REPORT_TITLE)]
        title: String,

        /// Footer inserted under every chart
        #[arg(short, long, default_value = DEFAULT_FOOTER)]
        footer: String,

        /// Output file (defaults to report.output_file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// HTML <title> of the page
        #[arg(long, default_value = DEFAULT_PAGE_TITLE)]
        page_title: String,

        /// Use the dark theme
        #[arg(long)]
        dark: bool,

        /// Configuration profile to apply (e.g., "fast")
        #[arg(short, long)]
        profile: Option<String>,

        /// Write every stage's output as JSON into this directory
        #[arg(long, value_name = "DIR")]
        dump_dir: Option<PathBuf>,
    },

    /// Print the structural profile of a CSV file as JSON
    Profile {
        /// Dataset to profile
        dataset: PathBuf,

        /// Include every row in the output
        #[arg(long)]
        full: bool,
    },

    /// Render a report from previously dumped report data, without model calls
    Render {
        /// report_data.json written by `generate --dump-dir`
        data: PathBuf,

        /// Dataset the snippets read
        #[arg(short, long)]
        dataset: PathBuf,

        /// Output file (defaults to report.output_file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use the dark theme
        #[arg(long)]
        dark: bool,

        /// Title shown in the report
        #[arg(short, long, default_value = DEFAULT_REPORT_TITLE)]
        title: String,

        /// HTML <title> of the page
        #[arg(long, default_value = DEFAULT_PAGE_TITLE)]
        page_title: String,

        /// Footer inserted under every chart
        #[arg(short, long, default_value = DEFAULT_FOOTER)]
        footer: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
