// Column type inference and typed value conversion for CSV fields
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Markers read as missing values, matching common tabular readers
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Inferred column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Int64,
    Float64,
    Bool,
    Object,
}

impl Dtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dtype::Int64 => "int64",
            Dtype::Float64 => "float64",
            Dtype::Bool => "bool",
            Dtype::Object => "object",
        }
    }
}

impl std::fmt::Display for Dtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a raw field counts as missing
pub fn is_missing(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw.trim())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Infer the column type from its raw fields.
///
/// Integer columns with gaps widen to float64 and boolean columns with gaps
/// fall back to object, the same widening a dataframe reader applies.
pub fn infer_dtype<'a>(values: impl Iterator<Item = &'a str>) -> Dtype {
    let mut all_int = true;
    let mut all_float = true;
    let mut all_bool = true;
    let mut present = 0usize;
    let mut missing = 0usize;

    for value in values {
        if is_missing(value) {
            missing += 1;
            continue;
        }
        present += 1;

        let trimmed = value.trim();
        if trimmed.parse::<i64>().is_err() {
            all_int = false;
        }
        if trimmed.parse::<f64>().is_err() {
            all_float = false;
        }
        if parse_bool(trimmed).is_none() {
            all_bool = false;
        }
        if !all_int && !all_float && !all_bool {
            break;
        }
    }

    if present == 0 {
        return Dtype::Float64;
    }

    if all_int {
        if missing > 0 {
            Dtype::Float64
        } else {
            Dtype::Int64
        }
    } else if all_float {
        Dtype::Float64
    } else if all_bool && missing == 0 {
        Dtype::Bool
    } else {
        Dtype::Object
    }
}

/// Convert a raw field to a typed JSON value according to the column type
pub fn to_value(raw: &str, dtype: Dtype) -> Value {
    if is_missing(raw) {
        return Value::Null;
    }

    let trimmed = raw.trim();
    match dtype {
        Dtype::Int64 => trimmed
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        Dtype::Float64 => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            // Non-finite values have no JSON number form
            .unwrap_or_else(|| Value::String(trimmed.to_string())),
        Dtype::Bool => parse_bool(trimmed)
            .map(Value::Bool)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        Dtype::Object => Value::String(raw.to_string()),
    }
}
