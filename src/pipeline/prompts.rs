// Prompt construction for the model-driven stages
use std::fmt::Write;
use std::path::Path;

use super::types::Tier;
use crate::dataset::DatasetProfile;

/// Character the descriptions and code are asked to avoid
pub const DISALLOWED_CHAR: char = '/';

/// Prompt asking for `per_tier` descriptions in each of the three tiers
pub fn recommendation_prompt(profile_json: &str, per_tier: usize) -> String {
    format!(
        r#"You are an experienced data analyst specializing in exploratory data analysis.
You receive structured metadata describing a dataset and recommend analyses that help a reader understand it, from quick descriptive views to more complex patterns.

Recommend exactly {per_tier} analyses for each category: "simple", "intermediate" and "advanced".
Each recommendation must be a detailed description of at least 50 words explaining what to do, how to do it, and what to expect from it, so that it can be turned into a single chart on its own.
Do not use any machine learning models.
Use column names and human-readable labels (for example "male" and "female" rather than 0 and 1).
Do not repeat an analysis across categories.
Do not use the '{slash}' character anywhere in the output.

DATASET METADATA:
{profile_json}

Respond ONLY with valid JSON of this shape, no markdown and no text outside the JSON:
{{"simple": ["..."], "intermediate": ["..."], "advanced": ["..."]}}"#,
        per_tier = per_tier,
        slash = DISALLOWED_CHAR,
        profile_json = profile_json,
    )
}

fn tier_guidance(tier: Tier) -> &'static str {
    match tier {
        Tier::Simple => {
            "Keep each chart minimal, clean and readable. Focus on clarity and never include non-essential code."
        }
        Tier::Intermediate => {
            "Use moderate complexity such as grouped charts, faceting, subplots, hover templates or light interactivity."
        }
        Tier::Advanced => {
            "Use advanced Plotly features such as animations, 3D plots, statistical overlays or multi-view layouts."
        }
    }
}

fn column_overview(profile: &DatasetProfile) -> String {
    let mut out = String::new();
    for column in &profile.columns_info {
        let samples = column
            .sample_values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "- {} ({}, {} missing, {} unique) e.g. {}",
            column.name, column.dtype, column.num_missing, column.num_unique, samples
        );
    }
    out
}

/// Prompt asking for one Plotly snippet per description of a tier
pub fn codegen_prompt(
    tier: Tier,
    descriptions: &[String],
    profile: &DatasetProfile,
    csv_path: &Path,
    theme_directive: &str,
) -> String {
    let mut analyses = String::new();
    for (i, description) in descriptions.iter().enumerate() {
        let _ = writeln!(analyses, "{}. {}", i + 1, description);
    }

    format!(
        r#"You are a data visualization engineer writing Python Plotly code for {tier} analyses.
{guidance}

Generate exactly {count} Python code snippets, one per analysis below, in the same order.

Rules for every snippet:
- The dataset from '{csv_path}' is already loaded as a pandas DataFrame named `data`; pandas is `pd`, plotly.express is `px`, plotly.graph_objects is `go`, numpy is `np`.
- Output raw Python only: no explanations, no comments, no markdown.
- Do not call fig.show() and do not use print statements.
- End with exactly ONE Plotly figure object assigned to the variable `fig`; the snippet must be self-contained.
- Do not use any machine learning models.
- Do not use the '{slash}' character except where Python syntax requires it.
- Styling: {theme}.

DATASET: {rows} rows, {cols} columns
{columns}
ANALYSES:
{analyses}
Respond ONLY with valid JSON of this shape, no markdown and no text outside the JSON:
{{"codes": ["<python code>", ...], "csv_path": "{csv_path}"}}"#,
        tier = tier,
        guidance = tier_guidance(tier),
        count = descriptions.len(),
        csv_path = csv_path.display(),
        slash = DISALLOWED_CHAR,
        theme = theme_directive,
        rows = profile.summary.num_rows,
        cols = profile.summary.num_columns,
        columns = column_overview(profile),
        analyses = analyses,
    )
}
