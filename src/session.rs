//! Session context: the bearer credential and the identity it resolved to.
//!
//! A `Session` is created anonymous or by verifying a credential against the
//! provider, handed to the workspace, and torn down with `logout`. Nothing
//! about the session lives in globals.

use std::fmt;

use crate::error::Result;
use crate::models::Identity;
use crate::provider::ContentProvider;

/// Opaque bearer credential. `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for an empty or whitespace-only token so callers never
    /// send a placeholder `Authorization` header.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// Parses an `Authorization: Bearer <token>` header value.
    pub fn from_bearer_header(value: &str) -> Option<Self> {
        let token = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))?;
        Self::new(token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(****)")
    }
}

/// What the signed-in user may do in a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Owner,
    ReadOnly,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    credential: Option<Credential>,
    identity: Option<Identity>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Verifies `credential` with the provider and keeps the resulting identity.
    pub async fn authenticate(
        provider: &dyn ContentProvider,
        credential: Credential,
    ) -> Result<Self> {
        let identity = provider.current_user(&credential).await?;
        tracing::info!("Session started for {}", identity.login);
        Ok(Self {
            credential: Some(credential),
            identity: Some(identity),
        })
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.credential.is_none()
    }

    /// Owner check by login only, case-insensitively. Collaborator
    /// permissions are not consulted: a repository the user does not
    /// literally own opens read-only.
    pub fn access_for(&self, owner: &str) -> Access {
        match (&self.credential, &self.identity) {
            (Some(_), Some(identity)) if identity.login.eq_ignore_ascii_case(owner) => {
                Access::Owner
            }
            _ => Access::ReadOnly,
        }
    }

    pub fn logout(self) {
        if let Some(identity) = &self.identity {
            tracing::info!("Session ended for {}", identity.login);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(login: &str) -> Identity {
        Identity {
            login: login.to_string(),
            name: None,
            avatar_url: None,
            email: None,
            public_repos: 0,
            followers: 0,
            following: 0,
        }
    }

    #[test]
    fn empty_tokens_are_not_credentials() {
        assert!(Credential::new("   ").is_none());
        assert!(Credential::from_bearer_header("Bearer ").is_none());
        assert!(Credential::from_bearer_header("Basic abc").is_none());
    }

    #[test]
    fn debug_output_hides_token() {
        let credential = Credential::new("gho_secret").unwrap();
        assert!(!format!("{:?}", credential).contains("gho_secret"));
    }

    #[test]
    fn owner_check_ignores_case() {
        let session = Session {
            credential: Credential::new("t"),
            identity: Some(identity("OctoCat")),
        };
        assert_eq!(session.access_for("octocat"), Access::Owner);
        assert_eq!(session.access_for("someone-else"), Access::ReadOnly);
    }

    #[test]
    fn anonymous_sessions_are_read_only() {
        assert_eq!(Session::anonymous().access_for("octocat"), Access::ReadOnly);
    }
}
