//! Integration tests for the `/api` routes.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use common::{Behavior, FakeProvider, body_json, body_text, get, post_json, post_raw};
use serde_json::json;

fn story_request(image_model: &str) -> serde_json::Value {
    json!({
        "prompt": "a fox who folds a paper moon",
        "gradeLevel": "2",
        "language": "English",
        "artStyle": "Watercolor",
        "model": "mistral-31-24b",
        "imageModel": image_model
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn story_without_prompt_returns_400() {
    let app = common::build_offline_app();
    let response = post_json(app, "/api/story", json!({ "prompt": "   ", "imageModel": "qwen-image" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "A story prompt is required.");
}

#[tokio::test]
async fn story_with_unsafe_image_model_returns_400() {
    let provider = Arc::new(FakeProvider::new(Behavior::Healthy));
    let app = common::build_test_app(provider.clone());
    let response = post_json(app, "/api/story", story_request("lustify-sdxl")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Please select a permitted safe Venice.ai image model.");
    assert!(provider.image_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn generate_image_without_text_returns_400() {
    let app = common::build_offline_app();
    let response = post_json(app, "/api/generate-image", json!({ "imageModel": "hidream" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Text is required for image generation.");
}

#[tokio::test]
async fn malformed_body_returns_json_error() {
    let app = common::build_offline_app();
    let response = post_raw(app, "/api/story", "application/json", "{prompt: 'fox'").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("Failed to parse"));
}

#[tokio::test]
async fn wrongly_typed_body_returns_json_error() {
    let app = common::build_offline_app();
    let response = post_json(app, "/api/generate-image", json!({ "text": ["not", "text"] })).await;

    assert!(response.status().is_client_error());
    let json = body_json(response).await;
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn missing_content_type_returns_json_error() {
    let app = common::build_offline_app();
    let response = post_raw(app, "/api/story-text", "text/plain", r#"{"prompt":"a fox"}"#).await;

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json = body_json(response).await;
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn numeric_grade_level_is_accepted() {
    let app = common::build_offline_app();
    let response = post_json(
        app,
        "/api/story",
        json!({ "prompt": "a fox", "gradeLevel": 3, "imageModel": "qwen-image" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["story"].as_array().unwrap().len(), 8);
}

// ---------------------------------------------------------------------------
// Offline mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn offline_story_has_eight_pages() {
    let app = common::build_offline_app();
    let response = post_json(app, "/api/story", story_request("qwen-image")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["story"].as_array().unwrap().len(), 8);
    assert_eq!(json["pageImageUrls"].as_array().unwrap().len(), 8);
    assert_eq!(json["metadata"]["fallback"], true);
    assert!(
        json["coverImageUrl"]
            .as_str()
            .unwrap()
            .starts_with("data:image/svg+xml;base64,")
    );
}

#[tokio::test]
async fn offline_models_returns_fallback_models() {
    let app = common::build_offline_app();
    let response = get(app, "/api/models").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["fallback"], true);
    assert_eq!(json["textModels"][0]["id"], "mock-storyteller");
    assert_eq!(json["imageModels"][0]["id"], "qwen-image");
    assert_eq!(
        json["imageModels"][0]["model_spec"]["constraints"]["promptCharacterLimit"],
        1000
    );
}

#[tokio::test]
async fn simple_test_endpoint_reports_offline() {
    let app = common::build_offline_app();
    let response = get(app, "/api/test?simple=true").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["fallback"], true);
    assert!(json["timestamp"].is_string());
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn offline_generate_image_returns_placeholder() {
    let app = common::build_offline_app();
    let response = post_json(
        app,
        "/api/generate-image",
        json!({ "text": "A fox on a hill", "imageModel": "hidream", "artStyle": "Watercolor" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["imageUrl"].as_str().unwrap().starts_with("data:image/svg+xml"));
    assert_eq!(json["structuredPrompt"]["scene"], "A fox on a hill");
}

// ---------------------------------------------------------------------------
// Online mode (fake provider)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn story_generates_full_book_with_safe_images() {
    let provider = Arc::new(FakeProvider::new(Behavior::Healthy));
    let app = common::build_test_app(provider.clone());
    let response = post_json(app, "/api/story", story_request("venice-sd35")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["title"], "The Paper Moon");
    assert_eq!(json["story"].as_array().unwrap().len(), 8);
    assert!(json.get("metadata").is_none());

    let requests = provider.image_requests.lock().unwrap();
    assert_eq!(requests.len(), 10);
    assert!(requests.iter().all(|r| r.safe_mode() && !r.hide_watermark()));
    assert!(requests.iter().all(|r| r.model() == "venice-sd35"));
}

#[tokio::test]
async fn story_falls_back_when_provider_fails() {
    let provider = Arc::new(FakeProvider::new(Behavior::Failing));
    let app = common::build_test_app(provider);
    let response = post_json(app, "/api/story", story_request("qwen-image")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["metadata"]["fallback"], true);
    assert_eq!(json["story"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn story_text_writes_story_and_character_in_one_call() {
    let provider = Arc::new(FakeProvider::new(Behavior::Healthy));
    let app = common::build_test_app(provider.clone());
    let response = post_json(app, "/api/story-text", json!({ "prompt": "a brave fox" })).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["title"], "The Paper Moon");
    assert_eq!(json["story"].as_array().unwrap().len(), 8);
    assert_eq!(json["characterDescription"], "Pip, a small red fox with a yellow scarf");
    assert_eq!(provider.chat_calls.load(Ordering::SeqCst), 1);
    assert!(provider.image_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn story_text_describes_character_when_reply_has_none() {
    let provider = Arc::new(FakeProvider::new(Behavior::NoCharacter));
    let app = common::build_test_app(provider.clone());
    let response = post_json(app, "/api/story-text", json!({ "prompt": "a brave fox" })).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["characterDescription"], "Pip, a small red fox with a yellow scarf");
    assert_eq!(provider.chat_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn story_text_upstream_failure_returns_500() {
    let app = common::build_test_app(Arc::new(FakeProvider::new(Behavior::Failing)));
    let response = post_json(app, "/api/story-text", json!({ "prompt": "a brave fox" })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Failed to generate story text.");
    assert!(json["details"].is_string());
}

#[tokio::test]
async fn models_are_filtered_and_ordered_by_allow_list() {
    let app = common::build_test_app(Arc::new(FakeProvider::new(Behavior::Healthy)));
    let response = get(app, "/api/models").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json.get("fallback").is_none());

    let text: Vec<&str> = json["textModels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(text, ["mistral-31-24b", "llama-3.3-70b"]);

    let images: Vec<&str> = json["imageModels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(images, ["venice-sd35", "hidream"]);
}

#[tokio::test]
async fn generate_image_returns_structured_prompt() {
    let provider = Arc::new(FakeProvider::new(Behavior::Healthy));
    let app = common::build_test_app(provider.clone());
    let response = post_json(
        app,
        "/api/generate-image",
        json!({ "text": "A fox on a hill", "imageModel": "hidream", "artStyle": "Watercolor" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["imageUrl"], "https://images.test/1.png");
    assert_eq!(
        json["finalPrompt"],
        "Style: Watercolor style. Characters: a fox. Scene: a hill"
    );
    assert_eq!(provider.image_requests.lock().unwrap()[0].size(), "1024x1024");
}

#[tokio::test]
async fn connection_test_lists_sample_models() {
    let app = common::build_test_app(Arc::new(FakeProvider::new(Behavior::Healthy)));
    let response = get(app, "/api/test").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["modelsCount"], 3);
    assert_eq!(json["sampleModels"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn connection_test_failure_returns_500() {
    let app = common::build_test_app(Arc::new(FakeProvider::new(Behavior::Failing)));
    let response = post_json(app, "/api/test", json!({})).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Test failed");
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[tokio::test]
async fn export_html_inlines_images() {
    let book = json!({
        "title": "The Paper Moon",
        "story": ["One.", "Two."],
        "coverImageUrl": "https://images.test/cover.png",
        "pageImageUrls": ["https://images.test/1.png", "https://images.test/2.png"],
        "endPageImageUrl": "https://images.test/end.png"
    });
    let app = common::build_offline_app();
    let response = post_json(app, "/api/export/html", book).await;

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("The_Paper_Moon.html"));

    let html = body_text(response).await;
    assert!(html.contains("<title>The Paper Moon</title>"));
    assert!(html.contains("data:image/png;base64,cG5n"));
    assert!(!html.contains("https://images.test/"));
    assert!(html.contains("Made with lots of love"));
}

#[tokio::test]
async fn export_html_sets_utf8_file_name() {
    let book = json!({
        "title": "चंदा मामा",
        "story": ["एक।"],
        "coverImageUrl": "",
        "pageImageUrls": [""],
        "endPageImageUrl": ""
    });
    let app = common::build_offline_app();
    let response = post_json(app, "/api/export/html", book).await;

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\""));
    assert!(disposition.contains("filename*=UTF-8''%E0%A4%9A"));
}

#[tokio::test]
async fn export_html_refuses_loopback_images() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let internal = axum::Router::new().route(
        "/internal/secret",
        axum::routing::get(|| async { ([("content-type", "image/png")], "TOP-SECRET-TOKEN") }),
    );
    tokio::spawn(async move { axum::serve(listener, internal).await });

    let book = json!({
        "title": "The Paper Moon",
        "story": ["One."],
        "coverImageUrl": format!("http://{addr}/internal/secret"),
        "pageImageUrls": [""],
        "endPageImageUrl": ""
    });
    let app = common::build_app_with_image_fetcher();
    let response = post_json(app, "/api/export/html", book).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_text(response).await;
    assert!(body.contains("is not allowed"));
    // base64 of "TOP-SECRET-TOKEN"
    assert!(!body.contains("VE9QLVNFQ1JFVC1UT0tFTg"));
}

#[tokio::test]
async fn export_html_refuses_non_http_images() {
    let book = json!({
        "title": "The Paper Moon",
        "story": ["One."],
        "coverImageUrl": "file:///etc/passwd",
        "pageImageUrls": [""],
        "endPageImageUrl": ""
    });
    let app = common::build_app_with_image_fetcher();
    let response = post_json(app, "/api/export/html", book).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("file:///etc/passwd"));
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = common::build_offline_app();
    let response = get(app, "/api/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
