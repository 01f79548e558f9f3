use axum::{
    Json, Router,
    extract::{Query, State},
    response::Redirect,
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, Authenticated};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/auth/github/login", get(login))
        .route("/auth/github/callback", get(callback))
        .route("/auth/github/verify", get(verify))
        .with_state(state)
}

async fn login(State(state): State<AppState>) -> Redirect {
    tracing::info!("Starting OAuth login");
    Redirect::to(&state.auth.login_url())
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
}

async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    match state.auth.exchange_code(query.code.as_deref()).await {
        Ok(credential) => Redirect::to(&state.auth.success_redirect(&credential)),
        Err(failure) => Redirect::to(&state.auth.error_redirect(&failure)),
    }
}

async fn verify(auth: Authenticated) -> Json<Value> {
    Json(json!({
        "success": true,
        "user": auth.identity,
    }))
}
