//! File content and mutation DTOs.
//!
//! - `FileContent`: decoded file text plus its version token
//! - `FileWrite` / `FileDelete`: mutation bodies (`{content, sha, message}`)
//! - `WriteOutcome` / `CommitRef`: what the provider reports back

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileContent {
    pub content: String,
    pub sha: String,
    pub path: String,
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileWrite {
    pub content: String,
    /// Version token of the content being replaced; absent for a create.
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileDelete {
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitRef {
    pub sha: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteOutcome {
    /// New version token of the written file.
    pub sha: String,
    pub commit: CommitRef,
}

/// Response body for proxy mutations.
#[derive(Debug, Clone, Serialize)]
pub struct MutationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    pub commit: CommitRef,
}

impl From<WriteOutcome> for MutationResponse {
    fn from(outcome: WriteOutcome) -> Self {
        Self {
            success: true,
            sha: Some(outcome.sha),
            commit: outcome.commit,
        }
    }
}

impl From<CommitRef> for MutationResponse {
    fn from(commit: CommitRef) -> Self {
        Self {
            success: true,
            sha: None,
            commit,
        }
    }
}
