//! Autosave coordinator: one actor task per open document.
//!
//! The task owns the `OpenDocument`, the debounce deadline and at most one
//! in-flight save. Callers talk to it through an `AutosaveHandle`; status
//! changes are published on a watch channel.
//!
//! State machine:
//! - `Clean` → `Dirty` on an edit whose encoding differs from the baseline
//! - every edit while `Dirty` pushes the deadline out by the full delay
//! - deadline elapsed or `save_now` → `Saving` (never two saves at once)
//! - success → `Clean`, or `Dirty` with a fresh window if edited meanwhile
//! - failure → `Dirty` with `last_error`; no automatic retry
//!
//! Closing the handle abandons the deadline. A save already in flight runs
//! to completion in the background.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::document::{OpenDocument, RichDocument};
use crate::error::{AppError, Result};
use crate::models::{FileWrite, RepoRef, WriteOutcome};
use crate::provider::ContentProvider;
use crate::session::Credential;
use crate::tree::TreeCache;

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveState {
    Clean,
    Dirty,
    Saving,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveStatus {
    pub state: SaveState,
    pub version_token: String,
    pub last_saved: Option<DateTime<Utc>>,
    pub last_error: Option<AppError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveKind {
    Debounced,
    Manual,
}

impl SaveKind {
    fn message(self, name: &str) -> String {
        match self {
            SaveKind::Debounced => format!("Auto-save {}", name),
            SaveKind::Manual => format!("Update {}", name),
        }
    }
}

enum Command {
    Edit(RichDocument),
    SaveNow,
    Flush(oneshot::Sender<SaveStatus>),
    Snapshot(oneshot::Sender<OpenDocument>),
    Close,
}

/// Everything a save needs besides the document itself.
pub struct SaveTarget {
    pub provider: Arc<dyn ContentProvider>,
    pub credential: Credential,
    pub repo: RepoRef,
    /// Loaded listings get the new version token after each successful save.
    pub tree: Option<TreeCache>,
}

pub struct AutosaveCoordinator;

impl AutosaveCoordinator {
    /// Starts the coordinator task for `document`.
    pub fn spawn(target: SaveTarget, document: OpenDocument, delay: Duration) -> AutosaveHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SaveStatus {
            state: SaveState::Clean,
            version_token: document.version_token().to_string(),
            last_saved: document.last_saved(),
            last_error: None,
        });

        let path = document.path().to_string();
        let actor = Actor {
            target,
            doc: document,
            delay,
            deadline: None,
            in_flight: None,
            waiters: Vec::new(),
            status: status_tx,
        };
        tokio::spawn(actor.run(rx));

        AutosaveHandle {
            path,
            tx,
            status: status_rx,
        }
    }
}

/// Caller side of a running coordinator. Dropping it closes the document.
pub struct AutosaveHandle {
    path: String,
    tx: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
}

impl AutosaveHandle {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn edit(&self, document: RichDocument) -> Result<()> {
        self.send(Command::Edit(document))
    }

    /// Cancels the pending debounce and saves now, unless a save is running.
    pub fn save_now(&self) -> Result<()> {
        self.send(Command::SaveNow)
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Current document state as held by the coordinator.
    pub async fn snapshot(&self) -> Result<OpenDocument> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        rx.await.map_err(|_| closed(&self.path))
    }

    /// Saves now and waits for the outcome. Resolves immediately when there
    /// is nothing to save.
    pub async fn save(&self) -> Result<SaveStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Flush(reply))?;
        rx.await.map_err(|_| closed(&self.path))
    }

    pub fn close(self) {
        let _ = self.tx.send(Command::Close);
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).map_err(|_| closed(&self.path))
    }
}

fn closed(path: &str) -> AppError {
    AppError::Internal(format!("Autosave for {} has stopped", path))
}

struct InFlight {
    raw_sent: String,
    task: JoinHandle<Result<WriteOutcome>>,
}

struct Actor {
    target: SaveTarget,
    doc: OpenDocument,
    delay: Duration,
    deadline: Option<Instant>,
    in_flight: Option<InFlight>,
    /// Callers of `save` waiting for the document to settle.
    waiters: Vec<oneshot::Sender<SaveStatus>>,
    status: watch::Sender<SaveStatus>,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!("Autosave started for {}", self.doc.path());

        loop {
            // The debounce only fires while nothing is in flight.
            let deadline = if self.in_flight.is_none() {
                self.deadline
            } else {
                None
            };

            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Edit(document)) => self.on_edit(document),
                    Some(Command::SaveNow) => {
                        self.deadline = None;
                        self.start_save(SaveKind::Manual);
                    }
                    Some(Command::Flush(reply)) => {
                        self.deadline = None;
                        self.waiters.push(reply);
                        self.start_save(SaveKind::Manual);
                        if self.in_flight.is_none() {
                            self.notify_waiters();
                        }
                    }
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(self.doc.clone());
                    }
                    Some(Command::Close) | None => break,
                },
                _ = debounce_elapsed(deadline) => {
                    self.deadline = None;
                    self.start_save(SaveKind::Debounced);
                }
                result = wait_save(&mut self.in_flight) => self.on_saved(result),
            }
        }

        if self.in_flight.is_some() {
            tracing::debug!("Closed {} with a save in flight", self.doc.path());
        }
        tracing::debug!("Autosave stopped for {}", self.doc.path());
    }

    fn on_edit(&mut self, document: RichDocument) {
        let dirty = self.doc.apply(document);
        if dirty {
            self.deadline = Some(Instant::now() + self.delay);
        } else {
            self.deadline = None;
        }

        if self.in_flight.is_none() {
            let state = if dirty { SaveState::Dirty } else { SaveState::Clean };
            self.publish(state);
        }
    }

    fn start_save(&mut self, kind: SaveKind) {
        if self.in_flight.is_some() {
            tracing::debug!("Save of {} already in flight", self.doc.path());
            return;
        }
        if !self.doc.is_dirty() {
            self.publish(SaveState::Clean);
            return;
        }

        let raw_sent = self.doc.encoded();
        let write = FileWrite {
            content: raw_sent.clone(),
            sha: Some(self.doc.version_token().to_string()),
            message: Some(kind.message(self.doc.name())),
        };
        tracing::info!("Saving {} ({:?})", self.doc.path(), kind);

        let provider = self.target.provider.clone();
        let credential = self.target.credential.clone();
        let repo = self.target.repo.clone();
        let path = self.doc.path().to_string();
        let task = tokio::spawn(async move {
            provider
                .write_file(&credential, &repo, &path, &write)
                .await
        });

        self.in_flight = Some(InFlight { raw_sent, task });
        self.publish(SaveState::Saving);
    }

    fn on_saved(&mut self, result: Result<WriteOutcome>) {
        let Some(flight) = self.in_flight.take() else {
            return;
        };

        match result {
            Ok(outcome) => {
                tracing::info!(
                    "Saved {} as {} ({})",
                    self.doc.path(),
                    outcome.sha,
                    outcome.commit.message
                );
                self.doc
                    .mark_saved(flight.raw_sent, outcome.sha.clone(), Utc::now());
                if let Some(tree) = &self.target.tree {
                    if let Err(e) = tree.record_version(self.doc.path(), &outcome.sha) {
                        tracing::warn!("Could not update listing for {}: {}", self.doc.path(), e);
                    }
                }
                self.status.send_modify(|s| s.last_error = None);

                if !self.doc.is_dirty() {
                    self.publish(SaveState::Clean);
                } else if self.waiters.is_empty() {
                    self.deadline = Some(Instant::now() + self.delay);
                    self.publish(SaveState::Dirty);
                } else {
                    // Edited while saving and someone is waiting: go again.
                    self.start_save(SaveKind::Manual);
                }
            }
            Err(e) => {
                tracing::warn!("Saving {} failed: {}", self.doc.path(), e);
                self.status.send_modify(|s| s.last_error = Some(e));
                self.publish(SaveState::Dirty);
            }
        }

        if self.in_flight.is_none() {
            self.notify_waiters();
        }
    }

    fn notify_waiters(&mut self) {
        let status = self.status.borrow().clone();
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(status.clone());
        }
    }

    fn publish(&self, state: SaveState) {
        let version_token = self.doc.version_token().to_string();
        let last_saved = self.doc.last_saved();
        self.status.send_modify(|s| {
            s.state = state;
            s.version_token = version_token;
            s.last_saved = last_saved;
        });
    }
}

async fn debounce_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn wait_save(in_flight: &mut Option<InFlight>) -> Result<WriteOutcome> {
    match in_flight {
        Some(flight) => match (&mut flight.task).await {
            Ok(result) => result,
            Err(e) => Err(AppError::Internal(format!("Save task failed: {}", e))),
        },
        None => std::future::pending().await,
    }
}
