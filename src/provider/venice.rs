//! Venice.ai client over its OpenAI-compatible REST API.

use super::{ChatRequest, ModelInfo, ModelKind, StoryProvider};
use crate::config::ApiConfig;
use crate::error::ProviderError;
use crate::safety::ImageRequest;
use crate::utils::check_response_status;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Response from the chat completions API.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

/// A single choice in the response.
#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

/// Message content in a response.
#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Response from the image generations API.
#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
}

/// Response from the models API.
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

/// Client for the Venice.ai API.
pub struct VeniceClient {
    /// HTTP client for API requests.
    client: Client,
    /// API configuration.
    config: ApiConfig,
}

impl VeniceClient {
    /// Create a new client. Fails if the API key isn't configured.
    pub fn new(config: ApiConfig) -> Result<Self, ProviderError> {
        if !config.is_configured() {
            return Err(ProviderError::InvalidConfig(
                "Venice.ai API key is not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl StoryProvider for VeniceClient {
    fn name(&self) -> &'static str {
        "Venice.ai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.config.key)
            .json(request)
            .send()
            .await?;
        let response = check_response_status(response).await?;

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| ProviderError::EmptyResponse("No choices in chat response".to_string()))
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.endpoint("images/generations"))
            .bearer_auth(&self.config.key)
            .json(request)
            .send()
            .await?;
        let response = check_response_status(response).await?;

        let body: ImageResponse = response.json().await?;
        let first = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::EmptyResponse("No images in response".to_string()))?;

        match (first.url, first.b64_json) {
            (Some(url), _) if !url.is_empty() => Ok(url),
            (_, Some(b64)) if !b64.is_empty() => Ok(format!("data:image/png;base64,{}", b64)),
            _ => Err(ProviderError::EmptyResponse(
                "Image response carried neither url nor b64_json".to_string(),
            )),
        }
    }

    async fn list_models(&self, kind: ModelKind) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = Url::parse_with_params(&self.endpoint("models"), &[("type", kind.as_str())])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.key)
            .send()
            .await?;
        let response = check_response_status(response).await?;

        let body: ModelsResponse = response.json().await?;
        Ok(body.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> ApiConfig {
        ApiConfig {
            key: "test-key".to_string(),
            base_url: "https://api.venice.ai/api/v1/".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        assert!(VeniceClient::new(ApiConfig::default()).is_err());
        assert!(VeniceClient::new(configured()).is_ok());
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = VeniceClient::new(configured()).unwrap();
        assert_eq!(
            client.endpoint("chat/completions"),
            "https://api.venice.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_chat_response_parsing() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"hi"}}]}"#)
                .unwrap();
        assert_eq!(
            body.choices[0].message.as_ref().and_then(|m| m.content.as_deref()),
            Some("hi")
        );
    }

    #[test]
    fn test_image_response_parsing() {
        let body: ImageResponse =
            serde_json::from_str(r#"{"created":1,"data":[{"url":"https://img/1.png"}]}"#).unwrap();
        assert_eq!(body.data[0].url.as_deref(), Some("https://img/1.png"));
        assert!(body.data[0].b64_json.is_none());
    }
}
