//! Command line and environment configuration.
//!
//! Every option can come from a flag or from the environment variable named
//! next to it, so the server runs unchanged from a `.env`-style deployment.

use std::time::Duration;

use clap::{Args, FromArgMatches, Parser, Subcommand};

use crate::auth::{DEFAULT_FRONTEND_URL, DEFAULT_OAUTH_URL, OAuthConfig};
use crate::provider::GitHubConfig;
use crate::provider::github::DEFAULT_API_URL;
use crate::session::Credential;

/// Git Editor - browse and edit GitHub repositories
#[derive(Parser, Debug)]
#[command(name = "git-editor")]
#[command(about = "Browse and edit GitHub repositories", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP proxy (default)
    Serve(ServeArgs),
    /// Print a repository's directory tree
    Tree {
        /// Repository as owner/name or a github.com URL
        repo: String,
        /// Directory to start from
        #[arg(long, default_value = "")]
        path: String,
        /// How many directory levels to expand
        #[arg(long, default_value_t = 1)]
        depth: usize,
    },
    /// Print a file's decoded rich document as JSON
    Open { repo: String, path: String },
    /// Replace a file's content and save it
    Put {
        repo: String,
        path: String,
        /// Local file holding the new content
        #[arg(long = "from")]
        from: std::path::PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    /// Access token; anonymous when absent
    #[arg(long, env = "GITHUB_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Timeout for every provider request, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 15, global = true)]
    pub timeout_secs: u64,

    /// Quiet period after the last edit before an autosave, in milliseconds
    #[arg(long, env = "AUTOSAVE_DELAY_MS", default_value_t = 2000, global = true)]
    pub autosave_delay_ms: u64,
}

impl ProviderArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn github_config(&self) -> GitHubConfig {
        GitHubConfig {
            api_url: self.api_url.clone(),
            timeout: self.timeout(),
        }
    }

    pub fn credential(&self) -> Option<Credential> {
        self.token.clone().and_then(Credential::new)
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(short, long, env = "PORT", default_value_t = 4000)]
    pub port: u16,

    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// OAuth application client id
    #[arg(long, env = "CLIENT_ID", default_value = "")]
    pub client_id: String,

    #[arg(long, env = "CLIENT_SECRET", default_value = "", hide_env_values = true)]
    pub client_secret: String,

    /// Origin allowed by CORS and target of the OAuth redirects
    #[arg(long, env = "FRONTEND_URL", default_value = DEFAULT_FRONTEND_URL)]
    pub frontend_url: String,

    #[arg(long, env = "GITHUB_OAUTH_URL", default_value = DEFAULT_OAUTH_URL)]
    pub oauth_url: String,
}

impl ServeArgs {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn oauth_config(&self, timeout: Duration) -> OAuthConfig {
        OAuthConfig {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            oauth_url: self.oauth_url.clone(),
            frontend_url: self.frontend_url.clone(),
            timeout,
        }
    }

    /// Serve options from the environment alone, for a bare `git-editor`.
    pub fn from_env() -> Result<Self, clap::Error> {
        let command = Self::augment_args(clap::Command::new("serve"));
        let matches = command.try_get_matches_from(["serve"])?;
        Self::from_arg_matches(&matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_flags() {
        let cli = Cli::try_parse_from([
            "git-editor",
            "serve",
            "--port",
            "8080",
            "--client-id",
            "abc",
            "--frontend-url",
            "https://editor.example",
        ])
        .unwrap();

        let Some(Commands::Serve(args)) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.addr(), "127.0.0.1:8080");
        let oauth = args.oauth_config(Duration::from_secs(3));
        assert_eq!(oauth.client_id, "abc");
        assert_eq!(oauth.frontend_url, "https://editor.example");
    }

    #[test]
    fn global_provider_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "git-editor",
            "tree",
            "octocat/hello-world",
            "--depth",
            "2",
            "--token",
            "gho_x",
            "--timeout-secs",
            "0",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Commands::Tree { depth: 2, .. })));
        assert!(cli.provider.credential().is_some());
        assert_eq!(cli.provider.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn bare_invocation_defaults_to_serve_options() {
        let cli = Cli::try_parse_from(["git-editor"]).unwrap();
        assert!(cli.command.is_none());

        let args = ServeArgs::from_env().unwrap();
        assert!(!args.frontend_url.is_empty());
        assert!(!args.oauth_url.is_empty());
    }

    #[test]
    fn put_requires_source_file() {
        assert!(Cli::try_parse_from(["git-editor", "put", "o/r", "a.md"]).is_err());
    }
}
