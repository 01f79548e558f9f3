//! GitHub REST implementation of `ContentProvider`.
//!
//! Talks to the contents API (`/repos/{owner}/{repo}/contents/{path}`) for
//! listings and file bodies, `/user/repos` for the repository list and
//! `/user` for credential verification. File bodies travel base64 encoded in
//! both directions.
//!
//! Every request goes out with `User-Agent` and `Accept` headers and a bounded
//! timeout. `Authorization` is only attached when a credential is supplied;
//! anonymous calls carry no such header at all.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{CLIENT_USER_AGENT, ContentProvider, delete_message, normalize_path, update_message};
use crate::error::{AppError, Result};
use crate::models::{
    CommitRef, EntryType, FileContent, FileDelete, FileWrite, Identity, RepoListQuery, RepoRef,
    Repository, TreeEntry, WriteOutcome,
};
use crate::session::Credential;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub api_url: String,
    pub timeout: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

pub struct GitHubClient {
    client: Client,
    api_url: String,
}

/// One item of a contents response. Directory listings are arrays of these;
/// a file lookup is a single object carrying `content`.
#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    path: String,
    #[serde(rename = "type")]
    entry_type: EntryType,
    #[serde(default)]
    size: Option<u64>,
    sha: String,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl ContentItem {
    fn into_entry(self) -> TreeEntry {
        let size = match self.entry_type {
            EntryType::Directory => None,
            _ => self.size,
        };
        TreeEntry {
            name: self.name,
            path: self.path,
            entry_type: self.entry_type,
            size,
            sha: self.sha,
            download_url: self.download_url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsPayload {
    Listing(Vec<ContentItem>),
    Single(Box<ContentItem>),
}

#[derive(Debug, Deserialize)]
struct ShaOnly {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: ShaOnly,
    commit: CommitRef,
}

#[derive(Debug, Deserialize)]
struct DeleteContentsResponse {
    commit: CommitRef,
}

#[derive(Debug, Deserialize)]
struct ProviderMessage {
    #[serde(default)]
    message: Option<String>,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(CLIENT_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, config.api_url))
    }

    /// Create a client around a preconfigured reqwest client.
    pub fn with_client(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn request(
        &self,
        method: Method,
        url: String,
        credential: Option<&Credential>,
    ) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, GITHUB_MEDIA_TYPE);
        match credential {
            Some(credential) => builder.bearer_auth(credential.token()),
            None => builder,
        }
    }

    fn repo_url(&self, repo: &RepoRef) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_url,
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name)
        )
    }

    fn contents_url(&self, repo: &RepoRef, path: &str) -> String {
        let path = normalize_path(path);
        if path.is_empty() {
            return format!("{}/contents", self.repo_url(repo));
        }
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/contents/{}", self.repo_url(repo), encoded.join("/"))
    }

    async fn fetch_contents(
        &self,
        credential: Option<&Credential>,
        repo: &RepoRef,
        path: &str,
    ) -> Result<ContentsPayload> {
        let response = self
            .request(Method::GET, self.contents_url(repo, path), credential)
            .send()
            .await?;
        let response = check_status(response, &describe(repo, path)).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ContentProvider for GitHubClient {
    async fn list_repositories(
        &self,
        credential: &Credential,
        query: &RepoListQuery,
    ) -> Result<Vec<Repository>> {
        let response = self
            .request(
                Method::GET,
                format!("{}/user/repos", self.api_url),
                Some(credential),
            )
            .query(&[
                ("page", query.page.to_string()),
                ("per_page", query.per_page.to_string()),
                ("sort", query.sort.clone()),
                ("affiliation", "owner,collaborator".to_string()),
            ])
            .send()
            .await?;
        let response = check_status(response, "repositories").await?;
        let repositories: Vec<Repository> = response.json().await?;
        tracing::debug!("Found {} repositories", repositories.len());
        Ok(repositories)
    }

    async fn get_repository(
        &self,
        credential: Option<&Credential>,
        repo: &RepoRef,
    ) -> Result<Repository> {
        let response = self
            .request(Method::GET, self.repo_url(repo), credential)
            .send()
            .await?;
        let response = check_status(response, &repo.to_string()).await?;
        Ok(response.json().await?)
    }

    async fn list_directory(
        &self,
        credential: Option<&Credential>,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Vec<TreeEntry>> {
        tracing::debug!("Listing {}", describe(repo, path));
        let entries = match self.fetch_contents(credential, repo, path).await? {
            ContentsPayload::Listing(items) => {
                items.into_iter().map(ContentItem::into_entry).collect()
            }
            ContentsPayload::Single(item) => vec![item.into_entry()],
        };
        Ok(entries)
    }

    async fn read_file(
        &self,
        credential: Option<&Credential>,
        repo: &RepoRef,
        path: &str,
    ) -> Result<FileContent> {
        let item = match self.fetch_contents(credential, repo, path).await? {
            ContentsPayload::Listing(_) => return Err(AppError::NotAFile(path.to_string())),
            ContentsPayload::Single(item) => *item,
        };
        if item.entry_type != EntryType::File {
            return Err(AppError::NotAFile(path.to_string()));
        }

        let content = match (item.encoding.as_deref(), item.content.as_deref()) {
            (Some("base64"), Some(encoded)) => decode_base64_text(encoded, &item.path)?,
            (None, Some(plain)) => plain.to_string(),
            (encoding, _) => {
                return Err(AppError::InvalidContent(format!(
                    "{} is served with unsupported encoding {:?}",
                    item.path, encoding
                )));
            }
        };

        tracing::debug!("Loaded {} ({} bytes)", item.path, content.len());
        Ok(FileContent {
            size: item.size.unwrap_or(content.len() as u64),
            content,
            sha: item.sha,
            path: item.path,
            name: item.name,
        })
    }

    async fn write_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        write: &FileWrite,
    ) -> Result<WriteOutcome> {
        let mut body = json!({
            "message": update_message(path, write),
            "content": STANDARD.encode(write.content.as_bytes()),
        });
        if let Some(sha) = &write.sha {
            body["sha"] = json!(sha);
        }

        let response = self
            .request(Method::PUT, self.contents_url(repo, path), Some(credential))
            .json(&body)
            .send()
            .await?;

        let target = describe(repo, path);
        let response = match response.status() {
            StatusCode::CONFLICT => return Err(AppError::Conflict(target)),
            StatusCode::UNPROCESSABLE_ENTITY if write.sha.is_some() => {
                return Err(AppError::Conflict(target));
            }
            StatusCode::UNPROCESSABLE_ENTITY => return Err(AppError::AlreadyExists(target)),
            _ => check_status(response, &target).await?,
        };

        let parsed: PutContentsResponse = response.json().await?;
        tracing::info!("Wrote {} -> {}", target, parsed.content.sha);
        Ok(WriteOutcome {
            sha: parsed.content.sha,
            commit: parsed.commit,
        })
    }

    async fn delete_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        delete: &FileDelete,
    ) -> Result<CommitRef> {
        let sha = delete
            .sha
            .as_deref()
            .filter(|sha| !sha.is_empty())
            .ok_or_else(|| AppError::MissingVersionToken(path.to_string()))?;

        let response = self
            .request(Method::DELETE, self.contents_url(repo, path), Some(credential))
            .json(&json!({
                "message": delete_message(path, delete),
                "sha": sha,
            }))
            .send()
            .await?;

        let target = describe(repo, path);
        if matches!(
            response.status(),
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            return Err(AppError::Conflict(target));
        }
        let response = check_status(response, &target).await?;
        let parsed: DeleteContentsResponse = response.json().await?;
        tracing::info!("Deleted {}", target);
        Ok(parsed.commit)
    }

    async fn current_user(&self, credential: &Credential) -> Result<Identity> {
        let response = self
            .request(
                Method::GET,
                format!("{}/user", self.api_url),
                Some(credential),
            )
            .send()
            .await?;
        let response = check_status(response, "user").await?;
        Ok(response.json().await?)
    }
}

fn describe(repo: &RepoRef, path: &str) -> String {
    let path = normalize_path(path);
    if path.is_empty() {
        repo.to_string()
    } else {
        format!("{}/{}", repo, path)
    }
}

fn decode_base64_text(encoded: &str, path: &str) -> Result<String> {
    // The provider wraps base64 payloads at 60 columns.
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| AppError::InvalidContent(format!("{}: {}", path, e)))?;
    String::from_utf8(bytes)
        .map_err(|_| AppError::InvalidContent(format!("{} is not valid UTF-8", path)))
}

async fn check_status(response: Response, target: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_exhausted = rate_limit_exhausted(response.headers());
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ProviderMessage>(&body)
        .ok()
        .and_then(|m| m.message)
        .unwrap_or_else(|| status.to_string());

    tracing::warn!("Provider returned {} for {}: {}", status, target, detail);
    Err(error_for_status(status, rate_exhausted, target, detail))
}

fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "0")
        .unwrap_or(false)
}

fn error_for_status(
    status: StatusCode,
    rate_exhausted: bool,
    target: &str,
    detail: String,
) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(detail),
        StatusCode::FORBIDDEN if rate_exhausted => AppError::RateLimited,
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited,
        StatusCode::FORBIDDEN => AppError::Forbidden(detail),
        StatusCode::NOT_FOUND => AppError::NotFound(target.to_string()),
        StatusCode::CONFLICT => AppError::Conflict(target.to_string()),
        s if s.is_server_error() => {
            AppError::NetworkError(format!("provider returned {}: {}", s, detail))
        }
        _ => AppError::BadRequest(detail),
    }
}
