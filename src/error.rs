//! Application error types and HTTP response mapping.
//!
//! Defines `AppError` for every failure the editor can surface and implements
//! Axum's `IntoResponse` so proxy handlers can return it directly as a JSON
//! error body. The same enum is what the tree cache, the autosave coordinator
//! and the CLI see, so provider failures are converted exactly once, at the
//! client boundary.
//!
//! Error mappings:
//! - `Unauthorized` → 401, `Forbidden` → 403, `NotFound` → 404
//! - `Conflict`, `AlreadyExists` → 409
//! - `NotAFile`, `MissingVersionToken`, `BadRequest` → 400
//! - `UnsupportedFileType`, `InvalidContent` → 422
//! - `RateLimited` → 429, `NetworkError` → 502, `Timeout` → 504
//! - `Internal` → 500

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Path is not a file: {0}")]
    NotAFile(String),

    #[error("Version token is stale for {0}")]
    Conflict(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Version token is required for {0}")]
    MissingVersionToken(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("File type is not editable: {0}")]
    UnsupportedFileType(String),

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotAFile(_) | AppError::MissingVersionToken(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict(_) | AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::UnsupportedFileType(_) | AppError::InvalidContent(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::NetworkError(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let target = err
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_else(|| "provider".to_string());
        if err.is_timeout() {
            AppError::Timeout(target)
        } else if err.is_decode() {
            AppError::InvalidContent(err.to_string())
        } else {
            AppError::NetworkError(err.to_string())
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
