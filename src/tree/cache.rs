//! Lazily populated directory listing cache for one repository.
//!
//! - Keyed by normalized directory path; `""` is the repository root
//! - A key is present once the directory has been expanded; an empty
//!   directory is stored as an empty listing, not as a missing key
//! - Population is coalesced per path: concurrent `expand` calls for the
//!   same unloaded path share one provider fetch
//! - Every caller coalesced onto a fetch gets that fetch's outcome, error
//!   included; a failed fetch is then dropped so the next `expand` retries
//!
//! Used by: `Workspace` (file tree), `AutosaveCoordinator` (version tokens)

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OnceCell;

use crate::error::{AppError, Result};
use crate::models::{RepoRef, TreeEntry, sort_entries};
use crate::provider::{ContentProvider, normalize_path, parent_path};
use crate::session::Credential;

/// A sorted directory listing, shared between the cache and its readers.
pub type Listing = Arc<Vec<TreeEntry>>;

type Slot = Arc<OnceCell<Result<Listing>>>;

/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct TreeCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    provider: Arc<dyn ContentProvider>,
    credential: Option<Credential>,
    repo: RepoRef,
    slots: Mutex<HashMap<String, Slot>>,
}

impl TreeCache {
    pub fn new(
        provider: Arc<dyn ContentProvider>,
        credential: Option<Credential>,
        repo: RepoRef,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                provider,
                credential,
                repo,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn repo(&self) -> &RepoRef {
        &self.inner.repo
    }

    /// Returns the listing for `path`, fetching and sorting it on first use.
    pub async fn expand(&self, path: &str) -> Result<Listing> {
        let path = normalize_path(path);
        let slot = self.slot_for(&path)?;

        let result = slot.get_or_init(|| self.fetch(&path)).await.clone();

        if let Err(e) = &result {
            tracing::warn!("Expanding {} failed: {}", display_path(&path), e);
            self.discard_failed(&path, &slot)?;
        }
        result
    }

    /// Presentation-only: the listing stays cached so re-expansion is instant.
    pub fn collapse(&self, path: &str) {
        tracing::trace!("Collapsed {}", display_path(&normalize_path(path)));
    }

    /// Drops the cached listing for `path`; the next `expand` refetches.
    pub fn invalidate(&self, path: &str) -> Result<bool> {
        let path = normalize_path(path);
        let removed = self.lock()?.remove(&path).is_some();
        if removed {
            tracing::debug!("Invalidated {}", display_path(&path));
        }
        Ok(removed)
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.cached(path).is_some()
    }

    /// The cached listing, without fetching.
    pub fn cached(&self, path: &str) -> Option<Listing> {
        let path = normalize_path(path);
        let slots = self.lock().ok()?;
        slots.get(&path).and_then(loaded)
    }

    pub fn loaded_paths(&self) -> Vec<String> {
        let Ok(slots) = self.lock() else {
            return Vec::new();
        };
        let mut paths: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| loaded(slot).is_some())
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Replaces the version token of `file_path` in its parent listing, if
    /// that listing is loaded. Returns whether an entry was updated.
    pub fn record_version(&self, file_path: &str, sha: &str) -> Result<bool> {
        let file_path = normalize_path(file_path);
        let parent = parent_path(&file_path);

        let mut slots = self.lock()?;
        let Some(listing) = slots.get(&parent).and_then(loaded) else {
            return Ok(false);
        };
        if !listing.iter().any(|e| e.path == file_path) {
            return Ok(false);
        }

        let updated: Vec<TreeEntry> = listing
            .iter()
            .map(|entry| {
                if entry.path == file_path {
                    let mut entry = entry.clone();
                    entry.sha = sha.to_string();
                    entry
                } else {
                    entry.clone()
                }
            })
            .collect();
        slots.insert(
            parent,
            Arc::new(OnceCell::new_with(Some(Ok(Arc::new(updated))))),
        );
        Ok(true)
    }

    async fn fetch(&self, path: &str) -> Result<Listing> {
        let start = std::time::Instant::now();
        let mut entries = self
            .inner
            .provider
            .list_directory(self.inner.credential.as_ref(), &self.inner.repo, path)
            .await?;
        sort_entries(&mut entries);
        tracing::info!(
            "Loaded {}: {} entries in {:?}",
            display_path(path),
            entries.len(),
            start.elapsed()
        );
        Ok(Arc::new(entries))
    }

    fn slot_for(&self, path: &str) -> Result<Slot> {
        let mut slots = self.lock()?;
        Ok(slots.entry(path.to_string()).or_default().clone())
    }

    /// Removes the slot holding a failed fetch, unless it was already
    /// replaced. Every caller that shared the fetch may call this.
    fn discard_failed(&self, path: &str, slot: &Slot) -> Result<()> {
        let mut slots = self.lock()?;
        if slots.get(path).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(path);
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Slot>>> {
        self.inner
            .slots
            .lock()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))
    }
}

fn loaded(slot: &Slot) -> Option<Listing> {
    match slot.get() {
        Some(Ok(listing)) => Some(listing.clone()),
        _ => None,
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "(root)" } else { path }
}
