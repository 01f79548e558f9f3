//! Editing workspace: one session, one selected repository, one open file.
//!
//! The workspace is what a single user interface drives. It holds the
//! provider handle and the session explicitly, builds a fresh `TreeCache`
//! when a repository is selected, and routes edits of the open file through
//! its autosave coordinator. Files in repositories the user does not own,
//! or opened anonymously, are read-only.

use std::sync::Arc;
use std::time::Duration;

use crate::autosave::{AutosaveCoordinator, AutosaveHandle, SaveStatus, SaveTarget};
use crate::document::{OpenDocument, RichDocument, dialect_for_path};
use crate::error::{AppError, Result};
use crate::models::{CommitRef, FileDelete, FileWrite, RepoRef, Repository, WriteOutcome};
use crate::provider::{ContentProvider, normalize_path, parent_path};
use crate::session::{Access, Credential, Session};
use crate::tree::{Listing, TreeCache};

pub enum OpenFile {
    ReadOnly(OpenDocument),
    Editable(AutosaveHandle),
}

impl OpenFile {
    pub fn path(&self) -> &str {
        match self {
            OpenFile::ReadOnly(doc) => doc.path(),
            OpenFile::Editable(handle) => handle.path(),
        }
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, OpenFile::Editable(_))
    }
}

struct Selection {
    repository: Repository,
    access: Access,
    tree: TreeCache,
}

pub struct Workspace {
    provider: Arc<dyn ContentProvider>,
    session: Session,
    autosave_delay: Duration,
    selection: Option<Selection>,
    open_file: Option<OpenFile>,
}

impl Workspace {
    pub fn new(provider: Arc<dyn ContentProvider>, session: Session, autosave_delay: Duration) -> Self {
        Self {
            provider,
            session,
            autosave_delay,
            selection: None,
            open_file: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn repository(&self) -> Option<&Repository> {
        self.selection.as_ref().map(|s| &s.repository)
    }

    pub fn access(&self) -> Option<Access> {
        self.selection.as_ref().map(|s| s.access)
    }

    pub fn tree(&self) -> Option<&TreeCache> {
        self.selection.as_ref().map(|s| &s.tree)
    }

    pub fn open_file(&self) -> Option<&OpenFile> {
        self.open_file.as_ref()
    }

    /// Selects a repository and starts a fresh, empty tree cache for it.
    /// Any open file is closed.
    pub async fn select_repository(&mut self, repo: &RepoRef) -> Result<&Repository> {
        let repository = self
            .provider
            .get_repository(self.session.credential(), repo)
            .await?;
        let access = self.session.access_for(&repository.owner.login);
        tracing::info!("Selected {} ({:?})", repo, access);

        self.close_file();
        let tree = TreeCache::new(
            self.provider.clone(),
            self.session.credential().cloned(),
            repository.repo_ref(),
        );
        let selection = self.selection.insert(Selection {
            repository,
            access,
            tree,
        });
        Ok(&selection.repository)
    }

    pub async fn expand(&self, path: &str) -> Result<Listing> {
        self.selected()?.tree.expand(path).await
    }

    pub fn collapse(&self, path: &str) -> Result<()> {
        self.selected()?.tree.collapse(path);
        Ok(())
    }

    /// Opens `path`, replacing the open file. Extensions outside the editable
    /// set are rejected before anything is fetched.
    pub async fn open(&mut self, path: &str) -> Result<&OpenFile> {
        let path = normalize_path(path);
        dialect_for_path(&path)?;
        let selection = self.selected()?;

        let file = self
            .provider
            .read_file(self.session.credential(), selection.tree.repo(), &path)
            .await?;
        let document = OpenDocument::open(file)?;

        let opened = match (selection.access, self.session.credential()) {
            (Access::Owner, Some(credential)) => {
                let target = SaveTarget {
                    provider: self.provider.clone(),
                    credential: credential.clone(),
                    repo: selection.tree.repo().clone(),
                    tree: Some(selection.tree.clone()),
                };
                OpenFile::Editable(AutosaveCoordinator::spawn(
                    target,
                    document,
                    self.autosave_delay,
                ))
            }
            _ => OpenFile::ReadOnly(document),
        };
        tracing::info!(
            "Opened {} ({})",
            path,
            if opened.is_editable() { "editable" } else { "read-only" }
        );

        self.close_file();
        Ok(self.open_file.insert(opened))
    }

    pub fn edit(&self, document: RichDocument) -> Result<()> {
        self.editable()?.edit(document)
    }

    pub fn save_now(&self) -> Result<()> {
        self.editable()?.save_now()
    }

    /// Saves the open file and waits for the outcome.
    pub async fn save(&self) -> Result<SaveStatus> {
        self.editable()?.save().await
    }

    pub fn save_status(&self) -> Option<SaveStatus> {
        match &self.open_file {
            Some(OpenFile::Editable(handle)) => Some(handle.status()),
            _ => None,
        }
    }

    /// The open file's current document, including unsaved edits.
    pub async fn document(&self) -> Result<OpenDocument> {
        match &self.open_file {
            Some(OpenFile::ReadOnly(doc)) => Ok(doc.clone()),
            Some(OpenFile::Editable(handle)) => handle.snapshot().await,
            None => Err(no_open_file()),
        }
    }

    /// Closes the open file. A save already in flight finishes in the background.
    pub fn close_file(&mut self) {
        match self.open_file.take() {
            Some(OpenFile::Editable(handle)) => {
                tracing::debug!("Closing {}", handle.path());
                handle.close();
            }
            Some(OpenFile::ReadOnly(doc)) => tracing::debug!("Closing {}", doc.path()),
            None => {}
        }
    }

    pub async fn create_file(
        &self,
        path: &str,
        content: String,
        message: Option<String>,
    ) -> Result<WriteOutcome> {
        let (selection, credential) = self.writable()?;
        let path = normalize_path(path);
        let write = FileWrite {
            content,
            sha: None,
            message,
        };
        let outcome = self
            .provider
            .write_file(credential, selection.tree.repo(), &path, &write)
            .await?;
        selection.tree.invalidate(&parent_path(&path))?;
        Ok(outcome)
    }

    pub async fn delete_file(
        &mut self,
        path: &str,
        sha: String,
        message: Option<String>,
    ) -> Result<CommitRef> {
        let path = normalize_path(path);
        let commit = {
            let (selection, credential) = self.writable()?;
            let delete = FileDelete {
                sha: Some(sha),
                message,
            };
            let commit = self
                .provider
                .delete_file(credential, selection.tree.repo(), &path, &delete)
                .await?;
            selection.tree.invalidate(&parent_path(&path))?;
            commit
        };

        if self.open_file.as_ref().is_some_and(|f| f.path() == path) {
            self.close_file();
        }
        Ok(commit)
    }

    /// Ends the session: the open file, selection and cache are dropped.
    pub fn logout(&mut self) {
        self.close_file();
        self.selection = None;
        std::mem::take(&mut self.session).logout();
    }

    fn selected(&self) -> Result<&Selection> {
        self.selection
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("No repository selected".to_string()))
    }

    fn writable(&self) -> Result<(&Selection, &Credential)> {
        let selection = self.selected()?;
        match (selection.access, self.session.credential()) {
            (Access::Owner, Some(credential)) => Ok((selection, credential)),
            _ => Err(AppError::Forbidden(format!(
                "{} is read-only for this session",
                selection.repository.full_name
            ))),
        }
    }

    fn editable(&self) -> Result<&AutosaveHandle> {
        match &self.open_file {
            Some(OpenFile::Editable(handle)) => Ok(handle),
            Some(OpenFile::ReadOnly(doc)) => {
                Err(AppError::Forbidden(format!("{} is open read-only", doc.path())))
            }
            None => Err(no_open_file()),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.close_file();
    }
}

fn no_open_file() -> AppError {
    AppError::BadRequest("No file is open".to_string())
}
