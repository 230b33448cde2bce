//! Image-model safety gate.
//!
//! Only pre-approved image models may be requested, and every outbound
//! image request carries the provider's safety flags. [`ImageRequest`] can
//! only be built through [`build_safe_image_request`], so no code path can
//! send an image request without them.

use crate::utils::truncate_chars;
use serde::Serialize;

/// A pre-approved image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeImageModel {
    /// Provider model identifier.
    pub id: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Maximum prompt length accepted by the model, in characters.
    pub prompt_character_limit: usize,
}

/// Allow-listed image models, in display order.
pub static SAFE_IMAGE_MODELS: [SafeImageModel; 3] = [
    SafeImageModel {
        id: "qwen-image",
        label: "Qwen Image",
        prompt_character_limit: 1400,
    },
    SafeImageModel {
        id: "venice-sd35",
        label: "Venice SD35",
        prompt_character_limit: 1400,
    },
    SafeImageModel {
        id: "hidream",
        label: "HiDream",
        prompt_character_limit: 1400,
    },
];

/// Model substituted when the requested one is not allowed.
pub const DEFAULT_SAFE_IMAGE_MODEL: &str = "qwen-image";

/// Limit used when no allow-listed model supplies one.
const FALLBACK_PROMPT_CHARACTER_LIMIT: usize = 1400;

/// Trims surrounding whitespace from a model identifier.
pub fn normalize_model_id(model_id: &str) -> &str {
    model_id.trim()
}

/// Looks up an allow-listed model by (normalized) identifier.
pub fn find_safe_model(model_id: &str) -> Option<&'static SafeImageModel> {
    let normalized = normalize_model_id(model_id);
    SAFE_IMAGE_MODELS.iter().find(|m| m.id == normalized)
}

/// Returns true if the identifier names an allow-listed image model.
pub fn is_allowed_image_model(model_id: Option<&str>) -> bool {
    model_id.and_then(find_safe_model).is_some()
}

/// Returns the normalized allowed identifier, or the default model.
pub fn enforce_safe_image_model(model_id: Option<&str>) -> &'static str {
    model_id
        .and_then(find_safe_model)
        .map(|m| m.id)
        .unwrap_or(DEFAULT_SAFE_IMAGE_MODEL)
}

/// Returns the prompt character limit for a model.
///
/// Unknown models get the smallest limit across the allow-list.
pub fn prompt_character_limit(model_id: &str) -> usize {
    match find_safe_model(model_id) {
        Some(model) => model.prompt_character_limit,
        None => SAFE_IMAGE_MODELS
            .iter()
            .map(|m| m.prompt_character_limit)
            .min()
            .unwrap_or(FALLBACK_PROMPT_CHARACTER_LIMIT),
    }
}

/// Truncates an image prompt so it never exceeds `limit` characters.
pub fn truncate_prompt(prompt: &str, limit: usize) -> &str {
    truncate_chars(prompt, limit)
}

/// Caller-controlled part of an image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageParams {
    pub prompt: String,
    pub size: String,
}

/// Outbound image generation request with the safety flags applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
    response_format: &'static str,
    safe_mode: bool,
    hide_watermark: bool,
}

impl ImageRequest {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    pub fn safe_mode(&self) -> bool {
        self.safe_mode
    }

    pub fn hide_watermark(&self) -> bool {
        self.hide_watermark
    }
}

/// Builds an image request for the enforced model with safe mode on and the
/// watermark visible.
pub fn build_safe_image_request(
    params: ImageParams,
    requested_model: Option<&str>,
) -> ImageRequest {
    ImageRequest {
        model: enforce_safe_image_model(requested_model).to_string(),
        prompt: params.prompt,
        n: 1,
        size: params.size,
        response_format: "url",
        safe_mode: true,
        hide_watermark: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list() {
        assert!(is_allowed_image_model(Some("qwen-image")));
        assert!(is_allowed_image_model(Some("  hidream\n")));
        assert!(!is_allowed_image_model(Some("flux-dev-uncensored")));
        assert!(!is_allowed_image_model(Some("")));
        assert!(!is_allowed_image_model(None));
    }

    #[test]
    fn test_enforce_substitutes_default() {
        assert_eq!(enforce_safe_image_model(Some(" venice-sd35 ")), "venice-sd35");
        assert_eq!(enforce_safe_image_model(Some("lustify-sdxl")), DEFAULT_SAFE_IMAGE_MODEL);
        assert_eq!(enforce_safe_image_model(None), DEFAULT_SAFE_IMAGE_MODEL);
    }

    #[test]
    fn test_safe_request_flags() {
        let request = build_safe_image_request(
            ImageParams {
                prompt: "a fox in a hat".to_string(),
                size: "1024x1024".to_string(),
            },
            Some("not-on-the-list"),
        );

        assert_eq!(request.model(), DEFAULT_SAFE_IMAGE_MODEL);
        assert!(request.safe_mode());
        assert!(!request.hide_watermark());

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["safe_mode"], true);
        assert_eq!(json["hide_watermark"], false);
        assert_eq!(json["response_format"], "url");
        assert_eq!(json["n"], 1);
    }

    #[test]
    fn test_prompt_character_limit() {
        assert_eq!(prompt_character_limit("hidream"), 1400);
        assert_eq!(prompt_character_limit("unknown"), 1400);
    }

    #[test]
    fn test_truncate_prompt_respects_limit() {
        let prompt = "ab".repeat(1000);
        for limit in [0, 1, 7, 1350, 1400, 5000] {
            let truncated = truncate_prompt(&prompt, limit);
            assert!(truncated.chars().count() <= limit);
            assert_eq!(truncated.chars().count(), limit.min(2000));
        }
    }
}
