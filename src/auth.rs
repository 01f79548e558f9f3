//! OAuth authentication gate.
//!
//! Builds the provider authorize URL, exchanges callback codes for bearer
//! credentials and verifies credentials into an `Identity`. Failures of the
//! callback are reported as short machine-readable reason codes that end up
//! in the frontend error redirect.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::Identity;
use crate::provider::{CLIENT_USER_AGENT, ContentProvider};
use crate::session::Credential;

pub const DEFAULT_OAUTH_URL: &str = "https://github.com";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
pub const OAUTH_SCOPE: &str = "repo user";

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub oauth_url: String,
    pub frontend_url: String,
    pub timeout: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Why a callback did not produce a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    NoCode,
    /// Error string reported by the provider, e.g. `bad_verification_code`.
    Provider(String),
    NoToken,
    ServerError,
}

impl AuthFailure {
    pub fn reason(&self) -> &str {
        match self {
            AuthFailure::NoCode => "no_code",
            AuthFailure::Provider(error) => error,
            AuthFailure::NoToken => "no_token",
            AuthFailure::ServerError => "server_error",
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct AuthGate {
    config: OAuthConfig,
    client: Client,
    provider: Arc<dyn ContentProvider>,
}

impl AuthGate {
    pub fn new(config: OAuthConfig, provider: Arc<dyn ContentProvider>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(CLIENT_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            client,
            provider,
        })
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        !self.config.client_id.is_empty() && !self.config.client_secret.is_empty()
    }

    pub fn login_url(&self) -> String {
        format!(
            "{}/login/oauth/authorize?client_id={}&scope={}",
            self.config.oauth_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(OAUTH_SCOPE)
        )
    }

    /// Trades the authorization code from the callback for a credential.
    pub async fn exchange_code(
        &self,
        code: Option<&str>,
    ) -> std::result::Result<Credential, AuthFailure> {
        let Some(code) = code.filter(|c| !c.trim().is_empty()) else {
            tracing::warn!("OAuth callback without authorization code");
            return Err(AuthFailure::NoCode);
        };

        let url = format!(
            "{}/login/oauth/access_token",
            self.config.oauth_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .json(&json!({
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
                "code": code,
            }))
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let body: TokenResponse = match response {
            Ok(response) => match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::error!("Unreadable token response: {}", e);
                    return Err(AuthFailure::ServerError);
                }
            },
            Err(e) => {
                tracing::error!("Token exchange failed: {}", e);
                return Err(AuthFailure::ServerError);
            }
        };

        if let Some(error) = body.error {
            tracing::warn!("Provider rejected OAuth code: {}", error);
            return Err(AuthFailure::Provider(error));
        }

        match body.access_token.and_then(Credential::new) {
            Some(credential) => {
                tracing::info!("OAuth code exchanged for access token");
                Ok(credential)
            }
            None => {
                tracing::warn!("Token response carried no access token");
                Err(AuthFailure::NoToken)
            }
        }
    }

    /// Resolves a credential to its identity; any provider failure is `Unauthorized`.
    pub async fn verify(&self, credential: &Credential) -> Result<Identity> {
        match self.provider.current_user(credential).await {
            Ok(identity) => {
                tracing::debug!("Token verified for {}", identity.login);
                Ok(identity)
            }
            Err(AppError::Unauthorized(reason)) => Err(AppError::Unauthorized(reason)),
            Err(e) => {
                tracing::warn!("Token verification failed: {}", e);
                Err(AppError::Unauthorized("Invalid or expired token".to_string()))
            }
        }
    }

    pub fn success_redirect(&self, credential: &Credential) -> String {
        format!(
            "{}/auth/success?token={}",
            self.frontend(),
            urlencoding::encode(credential.token())
        )
    }

    pub fn error_redirect(&self, failure: &AuthFailure) -> String {
        format!(
            "{}/auth/error?message={}",
            self.frontend(),
            urlencoding::encode(failure.reason())
        )
    }

    fn frontend(&self) -> &str {
        self.config.frontend_url.trim_end_matches('/')
    }
}
