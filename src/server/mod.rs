//! HTTP API.
//!
//! All routes live under `/api` and exchange JSON with the browser client.

mod error;
mod extract;
mod handlers;
mod state;

pub use error::{AppError, AppResult};
pub use extract::AppJson;
pub use handlers::ModelsResponse;
pub use state::AppState;

use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::error::ConfigError;

/// Exported books may carry inlined images.
const EXPORT_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Routes mounted under `/api`.
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/models", get(handlers::list_models))
        .route("/story", post(handlers::create_story))
        .route("/story-text", post(handlers::create_story_text))
        .route("/generate-image", post(handlers::generate_image))
        .route(
            "/test",
            get(handlers::connection_test).post(handlers::connection_test),
        )
        .route(
            "/export/html",
            post(handlers::export_html).layer(DefaultBodyLimit::max(EXPORT_BODY_LIMIT)),
        )
}

/// Build the full application [`Router`] with all middleware layers.
///
/// Fails if a configured CORS origin is not a valid header value.
pub fn build_router(state: AppState) -> Result<Router, ConfigError> {
    let server = &state.config.server;
    let cors = build_cors_layer(server)?;
    let timeout = Duration::from_secs(server.request_timeout_secs);

    Ok(Router::new()
        .nest("/api", api_routes())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state))
}

/// Build the CORS layer. No configured origins means any origin.
pub fn build_cors_layer(config: &ServerConfig) -> Result<CorsLayer, ConfigError> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    if config.cors_origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "server.cors_origins".to_string(),
                    message: format!("'{o}': {e}"),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(layer.allow_origin(origins))
}

/// Binds the configured address and serves until Ctrl-C or SIGTERM.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let host = state.config.server.host.clone();
    let port = state.config.server.port;
    let offline = state.is_offline();
    let app = build_router(state).context("Failed to build router")?;

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind to {host}:{port}"))?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, offline, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
