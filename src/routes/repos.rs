use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use super::{AppState, Authenticated};
use crate::error::Result;
use crate::models::{RepoListQuery, RepoRef, Repository};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/repos", get(list_repositories))
        .route("/api/repos/{owner}/{repo}", get(get_repository))
        .with_state(state)
}

async fn list_repositories(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<RepoListQuery>,
) -> Result<Json<Vec<Repository>>> {
    tracing::info!("Listing repositories for {}", auth.identity.login);
    let repositories = state
        .provider
        .list_repositories(&auth.credential, &query)
        .await?;
    Ok(Json(repositories))
}

async fn get_repository(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<Repository>> {
    let repository = state
        .provider
        .get_repository(Some(&auth.credential), &RepoRef::new(owner, repo))
        .await?;
    Ok(Json(repository))
}
