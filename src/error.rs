//! Error types for the Storybook application.
//!
//! Uses `thiserror` for structured error definitions that provide
//! clear context about what went wrong.

use thiserror::Error;

/// Error type for calls to the AI provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// Endpoint URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Provider answered successfully but without usable content
    #[error("Empty response: {0}")]
    EmptyResponse(String),

    /// Provider is not configured for this request
    #[error("Invalid API configuration: {0}")]
    InvalidConfig(String),
}

impl ProviderError {
    /// Returns true when the provider rejected the JSON `response_format` option.
    ///
    /// Venice reports this inside `details._errors[]` or `issues[].message`.
    pub fn rejects_response_format(&self) -> bool {
        let ProviderError::ApiError { body, .. } = self else {
            return false;
        };

        let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
            return false;
        };

        let detail_errors = value
            .pointer("/details/_errors")
            .and_then(|v| v.as_array())
            .into_iter()
            .flatten()
            .filter_map(|v| v.as_str());

        let issue_messages = value
            .get("issues")
            .and_then(|v| v.as_array())
            .into_iter()
            .flatten()
            .filter_map(|issue| issue.get("message").and_then(|m| m.as_str()));

        detail_errors
            .chain(issue_messages)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
            .contains("response_format is not supported")
    }
}

/// Error type for configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Config directory not found
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Error type for the book generation pipeline.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// A provider call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The model reply could not be turned into the expected structure
    #[error("Failed to parse model output: {0}")]
    ParseError(String),

    /// The model returned the wrong number of story pages
    #[error("Story must have exactly {expected} pages, got {actual}")]
    IncompleteStory { expected: usize, actual: usize },
}

/// Input rejected before any provider call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A story prompt is required.")]
    MissingPrompt,

    #[error("Text is required for image generation.")]
    MissingText,

    #[error("Please select a permitted safe Venice.ai image model.")]
    UnsafeImageModel,
}

/// Error type for book export.
#[derive(Error, Debug)]
pub enum RenderError {
    /// An image referenced by the book could not be downloaded
    #[error("Failed to fetch image {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: ProviderError,
    },

    /// The image URL points somewhere the exporter won't download from
    #[error("Image URL {url} is not allowed: {reason}")]
    BlockedUrl { url: String, reason: String },

    /// The download was not an image
    #[error("Image URL {url} did not return an image (content type '{content_type}')")]
    NotAnImage { url: String, content_type: String },

    /// The image exceeded the download limit
    #[error("Image {url} is larger than {limit} bytes")]
    TooLarge { url: String, limit: usize },
}

impl RenderError {
    /// True when the book itself is at fault rather than the image host.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, RenderError::FetchFailed { .. })
    }
}

/// Result type alias using anyhow for application-level error handling.
pub type Result<T> = anyhow::Result<T>;
