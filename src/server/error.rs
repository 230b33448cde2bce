use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::ValidationError;

/// Error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce the JSON error bodies the browser
/// client expects: `{error}` for bad input, `{error, details}` otherwise.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request rejected before any provider call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request body is not JSON of the expected shape.
    #[error(transparent)]
    InvalidBody(#[from] JsonRejection),

    /// The request names something the server refuses to act on.
    #[error("{0}")]
    BadRequest(String),

    /// A provider call or export step failed.
    #[error("{message}: {details}")]
    Upstream {
        message: &'static str,
        details: String,
    },
}

impl AppError {
    pub fn upstream(message: &'static str, err: impl std::fmt::Display) -> Self {
        AppError::Upstream {
            message,
            details: err.to_string(),
        }
    }
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(err) => (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({ "error": err.to_string() })),
            )
                .into_response(),
            AppError::InvalidBody(rejection) => (
                rejection.status(),
                axum::Json(json!({ "error": rejection.body_text() })),
            )
                .into_response(),
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({ "error": message })),
            )
                .into_response(),
            AppError::Upstream { message, details } => {
                tracing::error!(error = %details, "{}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({ "error": message, "details": details })),
                )
                    .into_response()
            }
        }
    }
}
