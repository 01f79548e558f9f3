//! Proxy route handlers - maps HTTP endpoints to provider operations.
//!
//! Each submodule defines routes for a feature area:
//! - `health`: Liveness and configuration summary (GET /health)
//! - `auth`: OAuth login, callback and token verification
//! - `repos`: Repository listing and metadata
//! - `contents`: Directory listings, sorted directories-first
//! - `files`: Read, update, create and delete single files
//!
//! Everything under `/api` requires `Authorization: Bearer <token>`; the
//! token is verified against the provider before the handler runs.

pub mod auth;
pub mod contents;
pub mod files;
pub mod health;
pub mod repos;

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::auth::AuthGate;
use crate::error::AppError;
use crate::models::Identity;
use crate::provider::ContentProvider;
use crate::session::Credential;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn ContentProvider>,
    pub auth: Arc<AuthGate>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes(state.clone()))
        .merge(auth::routes(state.clone()))
        .merge(repos::routes(state.clone()))
        .merge(contents::routes(state.clone()))
        .merge(files::routes(state))
        .fallback(not_found)
}

/// CORS limited to the configured frontend origin.
pub fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origin = frontend_url.trim_end_matches('/');
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!("Frontend URL {} is not a valid origin", frontend_url);
            layer
        }
    }
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": format!("Not Found - {}", uri),
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

/// A verified bearer credential.
pub struct Authenticated {
    pub credential: Credential,
    pub identity: Identity,
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credential = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(Credential::from_bearer_header)
            .ok_or_else(|| AppError::Unauthorized("Access token required".to_string()))?;

        let identity = state
            .auth
            .verify(&credential)
            .await
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(Self {
            credential,
            identity,
        })
    }
}
