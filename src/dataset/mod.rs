//! Dataset profiling
//!
//! Loads a CSV file and summarises its structure: shape, column types,
//! missing counts, distinct counts, sample values and a preview of the
//! first rows. The profile is the shared context every model-driven stage
//! receives.

mod infer;

pub use infer::{infer_dtype, is_missing, to_value, Dtype, MISSING_MARKERS};

use crate::error::{DataStoryError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Maximum number of distinct sample values kept per column
pub const SAMPLE_VALUES_PER_COLUMN: usize = 3;

/// Number of leading rows included as a preview
pub const PREVIEW_ROWS: usize = 5;

/// One record as an ordered field-name to value mapping
pub type Row = Map<String, Value>;

/// Dataset-level shape and per-column summary.
/// `dtypes` and `missing_values` are aligned with `columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub num_rows: usize,
    pub num_columns: usize,
    pub columns: Vec<String>,
    pub dtypes: Vec<Dtype>,
    pub missing_values: Vec<usize>,
}

/// Per-column details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: Dtype,
    pub num_missing: usize,
    pub num_unique: usize,
    pub sample_values: Vec<Value>,
}

/// Structural profile of a tabular dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub file_path: PathBuf,
    pub summary: DatasetSummary,
    pub columns_info: Vec<ColumnInfo>,
    pub sample_data: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_rows: Option<Vec<Row>>,
}

impl DatasetProfile {
    /// True when every per-column collection matches `num_columns`
    pub fn is_consistent(&self) -> bool {
        let n = self.summary.num_columns;
        self.summary.columns.len() == n
            && self.summary.dtypes.len() == n
            && self.summary.missing_values.len() == n
            && self.columns_info.len() == n
            && self
                .columns_info
                .iter()
                .zip(&self.summary.columns)
                .all(|(info, name)| &info.name == name)
    }

    /// Compact JSON used as model context
    pub fn to_prompt_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| DataStoryError::Json {
            source: e,
            context: "Failed to serialize dataset profile".to_string(),
        })
    }
}

/// Load a CSV file and build its profile.
///
/// # Arguments
/// * `path` - CSV file with a header row
/// * `include_full_data` - Attach every row to `raw_rows`
///
/// # Errors
/// `DataLoad` if the file is missing or malformed, `EmptyDataset` if it has
/// a header but no rows.
pub fn extract_profile(path: &Path, include_full_data: bool) -> Result<DatasetProfile> {
    let table = load_table(path)?;

    if table.rows.is_empty() {
        return Err(DataStoryError::EmptyDataset {
            path: path.to_path_buf(),
        });
    }

    let num_columns = table.headers.len();
    let mut dtypes = Vec::with_capacity(num_columns);
    let mut missing_values = Vec::with_capacity(num_columns);
    let mut columns_info = Vec::with_capacity(num_columns);

    for (idx, name) in table.headers.iter().enumerate() {
        let raw = table.rows.iter().map(|row| row[idx].as_str());
        let dtype = infer_dtype(raw.clone());

        let mut num_missing = 0;
        let mut seen = HashSet::new();
        let mut sample_values = Vec::new();

        for field in raw {
            let value = to_value(field, dtype);
            if value.is_null() {
                num_missing += 1;
                continue;
            }
            if seen.insert(value.to_string()) && sample_values.len() < SAMPLE_VALUES_PER_COLUMN {
                sample_values.push(value);
            }
        }

        dtypes.push(dtype);
        missing_values.push(num_missing);
        columns_info.push(ColumnInfo {
            name: name.clone(),
            dtype,
            num_missing,
            num_unique: seen.len(),
            sample_values,
        });
    }

    let to_row = |fields: &Vec<String>| -> Row {
        table
            .headers
            .iter()
            .zip(fields)
            .zip(&dtypes)
            .map(|((name, field), dtype)| (name.clone(), to_value(field, *dtype)))
            .collect()
    };

    let sample_data = table.rows.iter().take(PREVIEW_ROWS).map(to_row).collect();
    let raw_rows = include_full_data.then(|| table.rows.iter().map(to_row).collect());

    let profile = DatasetProfile {
        file_path: path.to_path_buf(),
        summary: DatasetSummary {
            num_rows: table.rows.len(),
            num_columns,
            columns: table.headers.clone(),
            dtypes,
            missing_values,
        },
        columns_info,
        sample_data,
        raw_rows,
    };

    tracing::debug!(
        "Profiled {:?}: {} rows x {} columns",
        path,
        profile.summary.num_rows,
        profile.summary.num_columns
    );

    Ok(profile)
}

/// Raw header and field strings of a CSV file
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn load_table(path: &Path) -> Result<RawTable> {
    let load_error = |message: String| DataStoryError::DataLoad {
        path: path.to_path_buf(),
        message,
    };

    if !path.is_file() {
        return Err(load_error("file not found".to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| load_error(e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| load_error(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) && headers.len() == 1 {
        return Err(load_error("no columns to parse from file".to_string()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| load_error(e.to_string()))?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }

    Ok(RawTable {
        headers: dedupe_headers(headers),
        rows,
    })
}

/// Suffix repeated header names with ".1", ".2", ... so every column is addressable
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut result = Vec::with_capacity(headers.len());

    for header in headers {
        let mut candidate = header.clone();
        let mut suffix = 1;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{}.{}", header, suffix);
            suffix += 1;
        }
        result.push(candidate);
    }

    result
}
