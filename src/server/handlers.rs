//! Request handlers for the `/api` routes.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{Html, IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::error::{AppError, AppResult};
use super::extract::AppJson;
use super::state::AppState;
use crate::book::{
    Book, GenerationRequest, Illustration, IllustrationRequest, StoryResult, Storyboard,
    StructuredPrompt,
};
use crate::fallback::{build_fallback_book, create_fallback_image};
use crate::provider::{ModelInfo, ModelKind, ModelSpec};
use crate::render::{RenderOptions, export_file_name, inline_images, render_book_html};
use crate::safety::{self, SAFE_IMAGE_MODELS};

/// Prompt limit advertised by the offline models.
const OFFLINE_PROMPT_CHARACTER_LIMIT: u32 = 1000;

/// Number of model ids echoed by the connection test.
const SAMPLE_MODEL_COUNT: usize = 3;

const STORY_TEXT_ERROR: &str = "Failed to generate story text.";

/// Body of `GET /api/models`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    pub text_models: Vec<ModelInfo>,
    pub image_models: Vec<ModelInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
}

fn offline_model(id: &str, name: &str) -> ModelInfo {
    let mut spec_extra = serde_json::Map::new();
    spec_extra.insert(
        "constraints".to_string(),
        json!({ "promptCharacterLimit": OFFLINE_PROMPT_CHARACTER_LIMIT }),
    );

    ModelInfo {
        id: id.to_string(),
        model_spec: Some(ModelSpec {
            name: Some(name.to_string()),
            offline: false,
            extra: spec_extra,
        }),
        extra: serde_json::Map::new(),
    }
}

/// Lists text models and the allow-listed image models.
pub async fn list_models(State(state): State<AppState>) -> AppResult<Json<ModelsResponse>> {
    let Some(provider) = state.provider.as_ref() else {
        return Ok(Json(ModelsResponse {
            text_models: vec![offline_model("mock-storyteller", "Offline Storyteller")],
            image_models: vec![offline_model(
                safety::DEFAULT_SAFE_IMAGE_MODEL,
                "Offline Illustrator",
            )],
            fallback: Some(true),
        }));
    };

    let (text, image) = tokio::try_join!(
        provider.list_models(ModelKind::Text),
        provider.list_models(ModelKind::Image),
    )
    .map_err(|e| AppError::upstream("Could not fetch models from Venice.ai", e))?;

    let text_models = text.into_iter().filter(ModelInfo::is_available).collect();
    let available_images: Vec<ModelInfo> = image
        .into_iter()
        .filter(|m| m.is_available() && safety::is_allowed_image_model(Some(m.id.as_str())))
        .collect();
    let image_models = SAFE_IMAGE_MODELS
        .iter()
        .filter_map(|safe| available_images.iter().find(|m| m.id == safe.id).cloned())
        .collect();

    Ok(Json(ModelsResponse {
        text_models,
        image_models,
        fallback: None,
    }))
}

/// Generates a complete illustrated book.
///
/// Offline, or when the pipeline fails, the offline book is returned instead.
pub async fn create_story(
    State(state): State<AppState>,
    AppJson(request): AppJson<GenerationRequest>,
) -> AppResult<Json<Book>> {
    request.validate()?;

    let Some(pipeline) = state.pipeline() else {
        warn!("Venice.ai API key missing, using offline fallback story");
        return Ok(Json(build_fallback_book(&request)));
    };

    match pipeline.generate_book(&request).await {
        Ok(book) => Ok(Json(book)),
        Err(e) => {
            warn!(error = %e, "Book generation failed, falling back to offline story");
            Ok(Json(build_fallback_book(&request)))
        }
    }
}

/// Writes the story text and character description without illustrations.
///
/// One prose call covers both; the character call only runs when the
/// prose reply leaves the description empty.
pub async fn create_story_text(
    State(state): State<AppState>,
    AppJson(request): AppJson<GenerationRequest>,
) -> AppResult<Json<StoryResult>> {
    request.validate_prompt()?;

    let Some(pipeline) = state.pipeline() else {
        warn!("Venice.ai API key missing, using offline fallback text");
        let book = build_fallback_book(&request);
        return Ok(Json(StoryResult {
            title: book.title,
            story: book.story,
            character_description: String::new(),
        }));
    };

    let mut story = pipeline
        .write_story(&request, None)
        .await
        .map_err(|e| AppError::upstream(STORY_TEXT_ERROR, e))?;
    if story.character_description.trim().is_empty() {
        story.character_description = pipeline
            .describe_character(&story, &Storyboard::default())
            .await
            .map_err(|e| AppError::upstream(STORY_TEXT_ERROR, e))?;
    }

    Ok(Json(story))
}

/// Generates one illustration from a structured prompt.
pub async fn generate_image(
    State(state): State<AppState>,
    AppJson(request): AppJson<IllustrationRequest>,
) -> AppResult<Json<Illustration>> {
    request.validate()?;

    let Some(pipeline) = state.pipeline() else {
        warn!("Venice.ai API key missing, using placeholder illustration");
        return Ok(Json(offline_illustration(&request)));
    };

    let illustration = pipeline
        .structured_illustration(&request)
        .await
        .map_err(|e| AppError::upstream("Failed to generate image", e))?;
    Ok(Json(illustration))
}

fn offline_illustration(request: &IllustrationRequest) -> Illustration {
    let structured_prompt = StructuredPrompt {
        style: request.art_style.clone().unwrap_or_default(),
        characters: request.character_description.clone().unwrap_or_default(),
        scene: request.text_content().to_string(),
    };
    let final_prompt = structured_prompt.combined();
    let (width, height) = if request.is_cover { (1792, 1024) } else { (1024, 1024) };
    let title = request.title.as_deref().unwrap_or("Illustration");

    Illustration {
        image_url: create_fallback_image(title, request.text_content(), width, height, 0),
        structured_prompt,
        final_prompt,
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TestParams {
    simple: Option<String>,
}

/// Reports whether the server and the provider connection work.
pub async fn connection_test(
    State(state): State<AppState>,
    Query(params): Query<TestParams>,
) -> AppResult<Json<Value>> {
    let simple = params.simple.as_deref() == Some("true");

    let provider = match state.provider.as_ref() {
        Some(provider) if !simple => provider,
        _ => {
            let message = if state.is_offline() {
                "Offline fallback mode active. Venice.ai API key not configured."
            } else {
                "Storybook server is working!"
            };
            return Ok(Json(json!({
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "version": env!("CARGO_PKG_VERSION"),
                "fallback": state.is_offline(),
            })));
        }
    };

    let models = provider
        .list_models(ModelKind::Text)
        .await
        .map_err(|e| AppError::upstream("Test failed", e))?;
    info!(count = models.len(), "Provider connection test succeeded");

    let sample: Vec<&str> = models
        .iter()
        .take(SAMPLE_MODEL_COUNT)
        .map(|m| m.id.as_str())
        .collect();
    Ok(Json(json!({
        "message": "Venice.ai API is working!",
        "modelsCount": models.len(),
        "sampleModels": sample,
    })))
}

/// Renders a posted book as a downloadable standalone HTML page.
pub async fn export_html(
    State(state): State<AppState>,
    AppJson(book): AppJson<Book>,
) -> AppResult<impl IntoResponse> {
    let book = inline_images(&book, state.fetcher.as_ref())
        .await
        .map_err(|e| {
            if e.is_client_error() {
                warn!(error = %e, "Refused to embed book image");
                AppError::BadRequest(e.to_string())
            } else {
                AppError::upstream("Failed to export the book.", e)
            }
        })?;

    let options = RenderOptions {
        signature: state.config.render.signature.clone(),
    };
    let html = render_book_html(&book, &options);

    let mut headers = HeaderMap::new();
    let disposition = content_disposition(&export_file_name(&book.title));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    info!(title = %book.title, bytes = html.len(), "Exported book as HTML");
    Ok((headers, Html(html)))
}

/// `attachment` disposition with an ASCII `filename` and an RFC 5987
/// `filename*` carrying the UTF-8 name.
fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    let encoded: String = url::form_urlencoded::byte_serialize(file_name.as_bytes()).collect();
    format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{encoded}")
}
