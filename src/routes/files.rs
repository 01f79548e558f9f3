//! Single-file endpoints under `/api/repos/{owner}/{repo}/file/{*path}`.
//!
//! Updates and deletes must present the version token of the content they
//! replace; the provider decides whether it is stale.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};

use super::{AppState, Authenticated};
use crate::error::{AppError, Result};
use crate::models::{FileContent, FileDelete, FileWrite, MutationResponse, RepoRef};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/repos/{owner}/{repo}/file/{*path}",
            get(read_file)
                .put(update_file)
                .post(create_file)
                .delete(delete_file),
        )
        .with_state(state)
}

type FilePath = Path<(String, String, String)>;

async fn read_file(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((owner, repo, path)): FilePath,
) -> Result<Json<FileContent>> {
    let file = state
        .provider
        .read_file(Some(&auth.credential), &RepoRef::new(owner, repo), &path)
        .await?;
    Ok(Json(file))
}

async fn update_file(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((owner, repo, path)): FilePath,
    payload: std::result::Result<Json<FileWrite>, JsonRejection>,
) -> Result<Json<MutationResponse>> {
    let Json(write) = payload?;
    if write.sha.as_deref().is_none_or(str::is_empty) {
        return Err(AppError::MissingVersionToken(path));
    }

    let outcome = state
        .provider
        .write_file(&auth.credential, &RepoRef::new(owner, repo), &path, &write)
        .await?;
    Ok(Json(outcome.into()))
}

async fn create_file(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((owner, repo, path)): FilePath,
    payload: std::result::Result<Json<FileWrite>, JsonRejection>,
) -> Result<(StatusCode, Json<MutationResponse>)> {
    let Json(write) = payload?;
    let write = FileWrite { sha: None, ..write };

    let outcome = state
        .provider
        .write_file(&auth.credential, &RepoRef::new(owner, repo), &path, &write)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

async fn delete_file(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((owner, repo, path)): FilePath,
    payload: std::result::Result<Json<FileDelete>, JsonRejection>,
) -> Result<Json<MutationResponse>> {
    let delete = match payload {
        Ok(Json(delete)) => delete,
        Err(JsonRejection::MissingJsonContentType(_)) => FileDelete::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    if delete.sha.as_deref().is_none_or(str::is_empty) {
        return Err(AppError::MissingVersionToken(path));
    }

    let commit = state
        .provider
        .delete_file(&auth.credential, &RepoRef::new(owner, repo), &path, &delete)
        .await?;
    Ok(Json(commit.into()))
}
