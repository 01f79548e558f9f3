use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use super::{AppState, Authenticated};
use crate::error::Result;
use crate::models::{RepoRef, TreeEntry, sort_entries};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/repos/{owner}/{repo}/contents", get(root_contents))
        .route("/api/repos/{owner}/{repo}/contents/{*path}", get(path_contents))
        .with_state(state)
}

async fn root_contents(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<Vec<TreeEntry>>> {
    list(&state, &auth, RepoRef::new(owner, repo), "").await
}

async fn path_contents(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((owner, repo, path)): Path<(String, String, String)>,
) -> Result<Json<Vec<TreeEntry>>> {
    list(&state, &auth, RepoRef::new(owner, repo), &path).await
}

async fn list(
    state: &AppState,
    auth: &Authenticated,
    repo: RepoRef,
    path: &str,
) -> Result<Json<Vec<TreeEntry>>> {
    let mut entries = state
        .provider
        .list_directory(Some(&auth.credential), &repo, path)
        .await?;
    sort_entries(&mut entries);
    tracing::debug!("{} entries in {}/{}", entries.len(), repo, path);
    Ok(Json(entries))
}
