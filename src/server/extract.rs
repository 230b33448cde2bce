use axum::extract::FromRequest;

use super::error::AppError;

/// `axum::Json` with rejections reported as JSON `{error}` bodies.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
