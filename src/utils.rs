//! Utility functions for common operations.

use crate::error::ProviderError;

/// Truncates text to at most `limit` characters without splitting a character.
///
/// # Arguments
/// * `text` - The text to truncate
/// * `limit` - Maximum number of characters to keep
///
/// # Returns
/// A prefix of `text` that is never longer than `limit` characters.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Escapes text for inclusion in HTML or SVG markup.
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Upper-cases the first character when it is a lowercase ASCII letter.
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {
            let mut result = String::with_capacity(text.len());
            result.push(first.to_ascii_uppercase());
            result.push_str(chars.as_str());
            result
        }
        _ => text.to_string(),
    }
}

/// Checks if an HTTP response is successful, and if not, returns a detailed error.
///
/// This helper keeps both the status code and the raw response body so callers
/// can inspect structured provider errors.
///
/// # Arguments
/// * `response` - The reqwest Response to check
///
/// # Returns
/// Ok(response) if successful, or Err(ProviderError) with details if not
pub async fn check_response_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::ApiError { status, body });
    }
    Ok(response)
}
