//! Content provider client.
//!
//! `ContentProvider` is the seam between the editor engine and the remote
//! repository host. The proxy routes, the tree cache, the autosave
//! coordinator and the session all talk to a `dyn ContentProvider`, so tests
//! swap in an in-memory implementation and production uses `GitHubClient`.
//!
//! Calls taking `Option<&Credential>` may run anonymously against public
//! repositories; calls taking `&Credential` require one.

pub mod github;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    CommitRef, FileContent, FileDelete, FileWrite, Identity, RepoListQuery, RepoRef, Repository,
    TreeEntry, WriteOutcome,
};
use crate::session::Credential;

pub use github::{GitHubClient, GitHubConfig};

/// Value sent as `User-Agent` on every provider request.
pub const CLIENT_USER_AGENT: &str = "git-editor";

#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Repositories the credential owns or collaborates on.
    async fn list_repositories(
        &self,
        credential: &Credential,
        query: &RepoListQuery,
    ) -> Result<Vec<Repository>>;

    async fn get_repository(
        &self,
        credential: Option<&Credential>,
        repo: &RepoRef,
    ) -> Result<Repository>;

    /// Lists a directory; `path = ""` is the repository root. Entries come back
    /// in provider order.
    async fn list_directory(
        &self,
        credential: Option<&Credential>,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Vec<TreeEntry>>;

    async fn read_file(
        &self,
        credential: Option<&Credential>,
        repo: &RepoRef,
        path: &str,
    ) -> Result<FileContent>;

    /// Creates the file when `write.sha` is `None`, otherwise updates it.
    async fn write_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        write: &FileWrite,
    ) -> Result<WriteOutcome>;

    async fn delete_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        delete: &FileDelete,
    ) -> Result<CommitRef>;

    async fn current_user(&self, credential: &Credential) -> Result<Identity>;
}

/// Normalizes a repository path: no leading/trailing slashes, no empty segments.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Directory containing `path` (`""` for top-level entries).
pub fn parent_path(path: &str) -> String {
    let path = normalize_path(path);
    match path.rsplit_once('/') {
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    }
}

/// Last segment of `path`.
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

pub(crate) fn update_message(path: &str, write: &FileWrite) -> String {
    match (&write.message, &write.sha) {
        (Some(message), _) if !message.trim().is_empty() => message.clone(),
        (_, Some(_)) => format!("Update {}", path),
        (_, None) => format!("Create {}", path),
    }
}

pub(crate) fn delete_message(path: &str, delete: &FileDelete) -> String {
    match &delete.message {
        Some(message) if !message.trim().is_empty() => message.clone(),
        _ => format!("Delete {}", path),
    }
}
