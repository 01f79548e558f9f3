use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use serde_json::{Value, json};

use super::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let set = |value: &str| if value.is_empty() { "Missing" } else { "Set" };
    let config = state.auth.config();

    Json(json!({
        "status": "OK",
        "message": "Git editor API is running",
        "timestamp": Utc::now().to_rfc3339(),
        "env": {
            "CLIENT_ID": set(&config.client_id),
            "CLIENT_SECRET": set(&config.client_secret),
            "FRONTEND_URL": config.frontend_url,
        },
    }))
}
