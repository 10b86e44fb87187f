use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    // A fenced block with an optional language tag: ```json ... ```
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").ok())
        .as_ref()
}

/// Return the body of the first markdown code fence, or the trimmed text when unfenced
pub fn strip_code_fence(text: &str) -> String {
    let text = text.trim();
    let body = fence_regex()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1));
    match body {
        Some(body) => body.as_str().trim().to_string(),
        None => text.to_string(),
    }
}

/// Parse a model reply as JSON, tolerating fences and surrounding prose
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let text = text.trim();
    let first = match serde_json::from_str(text) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    if let Ok(value) = serde_json::from_str(&strip_code_fence(text)) {
        return Ok(value);
    }

    // Outermost object in the reply
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str(&text[start..=end]).map_err(|e| e.to_string())
        }
        _ => Err(first),
    }
}
