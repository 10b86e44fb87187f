//! Datastory - narrated data reports from CSV files
//!
//! Profiles a dataset, asks a language model for analyses at three
//! difficulty tiers, generates and executes chart code for each one,
//! narrates every chart with a multimodal model and renders the results
//! into a themed HTML report.

pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod sandbox;
pub mod worker;

pub use error::{DataStoryError, Result};
