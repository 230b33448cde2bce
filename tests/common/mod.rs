#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use storybook::config::Config;
use storybook::error::{ProviderError, RenderError};
use storybook::provider::{ChatRequest, ModelInfo, ModelKind, StoryProvider};
use storybook::render::{Asset, AssetFetcher};
use storybook::safety::ImageRequest;
use storybook::server::{AppState, build_router};

/// Build a test `Config` with safe defaults and no API key.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.request_timeout_secs = 30;
    config
}

/// How the fake provider answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Answers every call with a well-formed reply.
    Healthy,
    /// Like `Healthy`, but the prose reply leaves the character empty.
    NoCharacter,
    /// Fails every call with an upstream 500.
    Failing,
}

/// In-memory provider that answers each pipeline stage by recognizing its prompt.
pub struct FakeProvider {
    behavior: Behavior,
    pub chat_calls: AtomicUsize,
    pub image_requests: Mutex<Vec<ImageRequest>>,
}

impl FakeProvider {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            chat_calls: AtomicUsize::new(0),
            image_requests: Mutex::new(Vec::new()),
        }
    }

    fn upstream_error() -> ProviderError {
        ProviderError::ApiError {
            status: 500,
            body: "upstream unavailable".to_string(),
        }
    }
}

fn model(id: &str, offline: bool) -> ModelInfo {
    serde_json::from_value(json!({
        "id": id,
        "model_spec": { "name": id, "offline": offline }
    }))
    .unwrap()
}

#[async_trait]
impl StoryProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        if self.behavior == Behavior::Failing {
            return Err(Self::upstream_error());
        }

        let system = &request.messages[0].content;
        let user = &request.messages[1].content;
        let pages: Vec<String> = (1..=8).map(|i| format!("Page {i} of the tale.")).collect();

        let reply = if user.starts_with("Text: ") {
            "A cheerful cartoon fox under a paper moon".to_string()
        } else if system.contains("children's book editor") {
            json!({
                "title": "The Paper Moon",
                "pages": pages,
                "characterDescription": "a small fox in a yellow scarf",
                "theme": "courage"
            })
            .to_string()
        } else if system.contains("single, detailed character description") {
            "Pip, a small red fox with a yellow scarf".to_string()
        } else if system.contains("structured JSON prompt") {
            json!({ "style": "Watercolor style", "characters": "a fox", "scene": "a hill" })
                .to_string()
        } else if system.contains("\"characterDescription\"") && self.behavior == Behavior::Healthy
        {
            json!({
                "title": "The Paper Moon",
                "story": pages,
                "characterDescription": "Pip, a small red fox with a yellow scarf"
            })
            .to_string()
        } else {
            json!({ "title": "The Paper Moon", "story": pages }).to_string()
        };
        Ok(reply)
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<String, ProviderError> {
        if self.behavior == Behavior::Failing {
            return Err(Self::upstream_error());
        }
        let mut requests = self.image_requests.lock().unwrap();
        requests.push(request.clone());
        Ok(format!("https://images.test/{}.png", requests.len()))
    }

    async fn list_models(&self, kind: ModelKind) -> Result<Vec<ModelInfo>, ProviderError> {
        if self.behavior == Behavior::Failing {
            return Err(Self::upstream_error());
        }
        Ok(match kind {
            ModelKind::Text => vec![
                model("mistral-31-24b", false),
                model("llama-3.3-70b", false),
                model("retired-model", true),
            ],
            ModelKind::Image => vec![
                model("hidream", false),
                model("lustify-sdxl", false),
                model("venice-sd35", false),
                model("qwen-image", true),
            ],
        })
    }
}

/// Serves a fixed PNG payload for any URL.
pub struct StaticFetcher;

#[async_trait]
impl AssetFetcher for StaticFetcher {
    async fn fetch(&self, _url: &str) -> Result<Asset, RenderError> {
        Ok(Asset {
            content_type: Some("image/png".to_string()),
            bytes: b"png".to_vec(),
        })
    }
}

/// Build the full application router in offline mode.
pub fn build_offline_app() -> Router {
    build_app(None)
}

/// Build the full application router over a fake provider.
pub fn build_test_app(provider: Arc<FakeProvider>) -> Router {
    build_app(Some(provider))
}

/// Build the offline router with the real image downloader.
pub fn build_app_with_image_fetcher() -> Router {
    let state = AppState::from_config(test_config()).unwrap();
    build_router(state).unwrap()
}

pub async fn post_raw(app: Router, uri: &str, content_type: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

fn build_app(provider: Option<Arc<FakeProvider>>) -> Router {
    let state = AppState {
        config: Arc::new(test_config()),
        provider: provider.map(|p| p as Arc<dyn StoryProvider>),
        fetcher: Arc::new(StaticFetcher),
    };
    build_router(state).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
