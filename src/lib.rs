//! Git Editor - browse and edit GitHub repositories.
//!
//! Library half of the `git-editor` binary:
//! - `provider`: content provider seam and its GitHub client
//! - `tree`: lazily populated, per-path coalesced directory cache
//! - `document`: rich document model, Markdown and plain dialects
//! - `autosave`: debounced, serialized saving of an open document
//! - `auth`, `session`, `workspace`: who is editing what
//! - `routes`: the HTTP proxy surface

pub mod auth;
pub mod autosave;
pub mod config;
pub mod document;
pub mod error;
pub mod models;
pub mod provider;
pub mod routes;
pub mod session;
pub mod tree;
pub mod workspace;

pub use error::{AppError, Result};
