//! Data transfer objects (DTOs) shared by the provider client, the proxy
//! routes and the editor engine.
//!
//! These structs deserialize from provider JSON and serialize to the proxy's
//! JSON responses.
//! - `repository`: Repository, RepoOwner, RepoRef, RepoListQuery
//! - `tree`: TreeEntry, EntryType for directory listings
//! - `file`: FileContent, FileWrite, FileDelete, WriteOutcome, CommitRef
//! - `user`: Identity returned by credential verification

pub mod file;
pub mod repository;
pub mod tree;
pub mod user;

pub use file::*;
pub use repository::*;
pub use tree::*;
pub use user::*;
