//! In-memory `ContentProvider` shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use git_editor::error::{AppError, Result};
use git_editor::models::{
    CommitRef, EntryType, FileContent, FileDelete, FileWrite, Identity, RepoListQuery, RepoOwner,
    RepoRef, Repository, TreeEntry, WriteOutcome,
};
use git_editor::provider::{ContentProvider, file_name, normalize_path, parent_path};
use git_editor::session::Credential;

pub const OWNER: &str = "octocat";
pub const REPO: &str = "notes";
pub const OWNER_TOKEN: &str = "owner-token";
pub const OTHER_TOKEN: &str = "other-token";

#[derive(Debug, Clone)]
struct StoredFile {
    content: String,
    sha: String,
}

#[derive(Default)]
struct FakeState {
    files: BTreeMap<String, StoredFile>,
    dirs: BTreeSet<String>,
    next_sha: u64,
    writes: Vec<(String, FileWrite)>,
}

pub struct FakeProvider {
    state: Mutex<FakeState>,
    users: HashMap<String, Identity>,
    pub list_calls: AtomicUsize,
    pub read_calls: AtomicUsize,
    pub write_calls: AtomicUsize,
    fail_next_list: AtomicBool,
    list_delay: Duration,
    write_delay: Duration,
}

pub fn identity(login: &str) -> Identity {
    Identity {
        login: login.to_string(),
        name: Some(format!("{} name", login)),
        avatar_url: None,
        email: None,
        public_repos: 1,
        followers: 0,
        following: 0,
    }
}

pub fn repo_ref() -> RepoRef {
    RepoRef::new(OWNER, REPO)
}

pub fn credential(token: &str) -> Credential {
    Credential::new(token).unwrap()
}

impl FakeProvider {
    pub fn new() -> Self {
        let mut users = HashMap::new();
        users.insert(OWNER_TOKEN.to_string(), identity(OWNER));
        users.insert(OTHER_TOKEN.to_string(), identity("someone-else"));

        Self {
            state: Mutex::new(FakeState::default()),
            users,
            list_calls: AtomicUsize::new(0),
            read_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
            fail_next_list: AtomicBool::new(false),
            list_delay: Duration::ZERO,
            write_delay: Duration::ZERO,
        }
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.put_file(path, content);
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.state.lock().unwrap().dirs.insert(normalize_path(path));
        self
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Stores `content` as if someone else had committed it; returns the new sha.
    pub fn put_file(&self, path: &str, content: &str) -> String {
        let path = normalize_path(path);
        let mut state = self.state.lock().unwrap();
        state.next_sha += 1;
        let sha = format!("sha-{}", state.next_sha);

        let mut parent = parent_path(&path);
        while !parent.is_empty() {
            state.dirs.insert(parent.clone());
            parent = parent_path(&parent);
        }
        state.files.insert(
            path,
            StoredFile {
                content: content.to_string(),
                sha: sha.clone(),
            },
        );
        sha
    }

    pub fn fail_next_list(&self) {
        self.fail_next_list.store(true, Ordering::SeqCst);
    }

    pub fn content(&self, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.files.get(path).map(|f| f.content.clone())
    }

    pub fn sha(&self, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.files.get(path).map(|f| f.sha.clone())
    }

    pub fn writes(&self) -> Vec<(String, FileWrite)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn check(&self, credential: &Credential) -> Result<&Identity> {
        self.users
            .get(credential.token())
            .ok_or_else(|| AppError::Unauthorized("Bad credentials".to_string()))
    }

    fn repository() -> Repository {
        Repository {
            id: 1,
            name: REPO.to_string(),
            full_name: format!("{}/{}", OWNER, REPO),
            description: None,
            private: false,
            owner: RepoOwner {
                login: OWNER.to_string(),
                avatar_url: None,
            },
            language: Some("Markdown".to_string()),
            stargazers_count: 0,
            forks_count: 0,
            updated_at: None,
            default_branch: "main".to_string(),
        }
    }

    fn check_repo(repo: &RepoRef) -> Result<()> {
        if repo.owner == OWNER && repo.name == REPO {
            Ok(())
        } else {
            Err(AppError::NotFound(repo.to_string()))
        }
    }
}

#[async_trait]
impl ContentProvider for FakeProvider {
    async fn list_repositories(
        &self,
        credential: &Credential,
        _query: &RepoListQuery,
    ) -> Result<Vec<Repository>> {
        self.check(credential)?;
        Ok(vec![Self::repository()])
    }

    async fn get_repository(
        &self,
        _credential: Option<&Credential>,
        repo: &RepoRef,
    ) -> Result<Repository> {
        Self::check_repo(repo)?;
        Ok(Self::repository())
    }

    async fn list_directory(
        &self,
        _credential: Option<&Credential>,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Vec<TreeEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.list_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.list_delay).await;
        }
        if self.fail_next_list.swap(false, Ordering::SeqCst) {
            return Err(AppError::NetworkError("connection reset".to_string()));
        }
        Self::check_repo(repo)?;

        let path = normalize_path(path);
        let state = self.state.lock().unwrap();
        if !path.is_empty() && !state.dirs.contains(&path) {
            return Err(AppError::NotFound(path));
        }

        let mut entries: Vec<TreeEntry> = state
            .dirs
            .iter()
            .filter(|dir| parent_path(dir) == path && !dir.is_empty())
            .map(|dir| TreeEntry {
                name: file_name(dir).to_string(),
                path: dir.clone(),
                entry_type: EntryType::Directory,
                size: None,
                sha: format!("tree-{}", dir),
                download_url: None,
            })
            .chain(
                state
                    .files
                    .iter()
                    .filter(|(file, _)| parent_path(file) == path)
                    .map(|(file, stored)| TreeEntry {
                        name: file_name(file).to_string(),
                        path: file.clone(),
                        entry_type: EntryType::File,
                        size: Some(stored.content.len() as u64),
                        sha: stored.sha.clone(),
                        download_url: None,
                    }),
            )
            .collect();
        // Provider order is not the presentation order.
        entries.reverse();
        Ok(entries)
    }

    async fn read_file(
        &self,
        _credential: Option<&Credential>,
        repo: &RepoRef,
        path: &str,
    ) -> Result<FileContent> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        Self::check_repo(repo)?;
        let path = normalize_path(path);
        let state = self.state.lock().unwrap();
        if state.dirs.contains(&path) {
            return Err(AppError::NotAFile(path));
        }
        let stored = state
            .files
            .get(&path)
            .ok_or_else(|| AppError::NotFound(path.clone()))?;
        Ok(FileContent {
            content: stored.content.clone(),
            sha: stored.sha.clone(),
            name: file_name(&path).to_string(),
            size: stored.content.len() as u64,
            path,
        })
    }

    async fn write_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        write: &FileWrite,
    ) -> Result<WriteOutcome> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        self.check(credential)?;
        Self::check_repo(repo)?;

        let path = normalize_path(path);
        {
            let mut state = self.state.lock().unwrap();
            state.writes.push((path.clone(), write.clone()));
            match (&write.sha, state.files.get(&path)) {
                (None, Some(_)) => return Err(AppError::AlreadyExists(path)),
                (Some(_), None) => return Err(AppError::NotFound(path)),
                (Some(sha), Some(stored)) if *sha != stored.sha => {
                    return Err(AppError::Conflict(path));
                }
                _ => {}
            }
        }

        let sha = self.put_file(&path, &write.content);
        let message = write
            .message
            .clone()
            .unwrap_or_else(|| format!("Update {}", path));
        Ok(WriteOutcome {
            sha,
            commit: CommitRef {
                sha: format!("commit-{}", self.write_count()),
                message,
            },
        })
    }

    async fn delete_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        delete: &FileDelete,
    ) -> Result<CommitRef> {
        self.check(credential)?;
        Self::check_repo(repo)?;
        let path = normalize_path(path);
        let sha = delete
            .sha
            .clone()
            .ok_or_else(|| AppError::MissingVersionToken(path.clone()))?;

        let mut state = self.state.lock().unwrap();
        match state.files.get(&path) {
            None => return Err(AppError::NotFound(path)),
            Some(stored) if stored.sha != sha => return Err(AppError::Conflict(path)),
            Some(_) => {}
        }
        state.files.remove(&path);
        Ok(CommitRef {
            sha: "commit-delete".to_string(),
            message: delete
                .message
                .clone()
                .unwrap_or_else(|| format!("Delete {}", path)),
        })
    }

    async fn current_user(&self, credential: &Credential) -> Result<Identity> {
        self.check(credential).cloned()
    }
}
