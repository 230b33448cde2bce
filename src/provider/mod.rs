//! Provider trait and wire types for the text and image API.
//!
//! The pipeline talks to the provider only through [`StoryProvider`], so
//! the live [`VeniceClient`] can be swapped for a scripted one in tests.

mod venice;

pub use venice::VeniceClient;

use crate::error::ProviderError;
use crate::safety::ImageRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A message in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role: "system", "user", or "assistant".
    pub role: String,
    /// Content of the message.
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Structured output mode for chat completions.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            kind: "json_object".to_string(),
        }
    }
}

/// Request body for the chat completions API.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    /// A two-message request: system instructions plus one user turn.
    pub fn new(
        model: impl Into<String>,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::system(system), Message::user(user)],
            response_format: None,
        }
    }

    /// The same request asking for a JSON object reply.
    pub fn json_mode(mut self) -> Self {
        self.response_format = Some(ResponseFormat::json_object());
        self
    }

    /// The same request without structured output.
    pub fn without_format(mut self) -> Self {
        self.response_format = None;
        self
    }

    pub fn is_json_mode(&self) -> bool {
        self.response_format.is_some()
    }
}

/// Which model listing to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Text,
    Image,
}

impl ModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Text => "text",
            ModelKind::Image => "image",
        }
    }
}

/// Provider-specific model details. Unknown fields are passed through.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub offline: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One entry of a model listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_spec: Option<ModelSpec>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ModelInfo {
    /// A model is usable when it has a spec and isn't marked offline.
    pub fn is_available(&self) -> bool {
        self.model_spec.as_ref().is_some_and(|spec| !spec.offline)
    }
}

/// Trait for the text and image generation backend.
#[async_trait]
pub trait StoryProvider: Send + Sync {
    /// Returns the human-readable name of this provider.
    fn name(&self) -> &'static str;

    /// Runs a chat completion and returns the first choice's content.
    async fn chat(&self, request: &ChatRequest) -> Result<String, ProviderError>;

    /// Generates one image and returns its URL or `data:` URI.
    async fn generate_image(&self, request: &ImageRequest) -> Result<String, ProviderError>;

    /// Lists models of the given kind.
    async fn list_models(&self, kind: ModelKind) -> Result<Vec<ModelInfo>, ProviderError>;
}
