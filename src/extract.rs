//! Recovery of JSON payloads from model replies.
//!
//! Models asked for JSON sometimes wrap it in markdown fences or chat
//! around it. Parsing tries, in order: the raw reply, the first
//! ```` ```json ```` block, the first fenced block of any kind, and the
//! outermost `{...}` span.

use crate::error::GenerationError;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

/// Regex for a fence explicitly tagged as JSON.
static JSON_FENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```json\s*(.*?)```").expect("Invalid JSON_FENCE_REGEX")
});

/// Regex for any fenced block.
static ANY_FENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)```").expect("Invalid ANY_FENCE_REGEX")
});

/// Parses a model reply into `T`, tolerating fences and surrounding prose.
pub fn parse_model_json<T: DeserializeOwned>(raw: &str) -> Result<T, GenerationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::ParseError(
            "No content received from model".to_string(),
        ));
    }

    let direct_error = match serde_json::from_str::<T>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    for regex in [&*JSON_FENCE_REGEX, &*ANY_FENCE_REGEX] {
        if let Some(body) = regex.captures(trimmed).and_then(|c| c.get(1)) {
            if let Ok(value) = serde_json::from_str::<T>(body.as_str().trim()) {
                return Ok(value);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<T>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(GenerationError::ParseError(format!(
        "JSON parse error: {}",
        direct_error
    )))
}
