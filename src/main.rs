//! Git Editor - browse and edit GitHub repositories
//!
//! # Usage
//! ```bash
//! git-editor serve --port 4000                 # Run the OAuth + API proxy
//! git-editor tree octocat/hello-world --depth 2  # Print the file tree
//! git-editor open octocat/hello-world README.md  # Print the decoded document
//! git-editor put owner/repo notes.md --from notes.md --token <TOKEN>
//! ```

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use git_editor::AppError;
use git_editor::auth::AuthGate;
use git_editor::config::{Cli, Commands, ProviderArgs, ServeArgs};
use git_editor::document::{self, Dialect};
use git_editor::models::RepoRef;
use git_editor::provider::{ContentProvider, GitHubClient};
use git_editor::routes::{self, AppState};
use git_editor::session::Session;
use git_editor::workspace::{OpenFile, Workspace};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = match cli.command {
        Some(command) => command,
        None => Commands::Serve(ServeArgs::from_env()?),
    };

    // Chatty for the server, quiet for one-shot commands
    let default_level = match command {
        Commands::Serve(_) => "info",
        _ => "warn",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let provider: Arc<dyn ContentProvider> =
        Arc::new(GitHubClient::new(cli.provider.github_config())?);

    match command {
        Commands::Serve(args) => serve(provider, &cli.provider, args).await,
        Commands::Tree { repo, path, depth } => {
            print_tree(provider, &cli.provider, &repo, &path, depth).await
        }
        Commands::Open { repo, path } => open(provider, &cli.provider, &repo, &path).await,
        Commands::Put { repo, path, from } => {
            put(provider, &cli.provider, &repo, &path, &from).await
        }
    }
}

async fn serve(
    provider: Arc<dyn ContentProvider>,
    provider_args: &ProviderArgs,
    args: ServeArgs,
) -> anyhow::Result<()> {
    let auth = AuthGate::new(args.oauth_config(provider_args.timeout()), provider.clone())?;
    if !auth.is_configured() {
        tracing::warn!("CLIENT_ID / CLIENT_SECRET not set; OAuth login will fail");
    }

    let state = AppState {
        provider,
        auth: Arc::new(auth),
    };
    let app = routes::create_router(state)
        .layer(routes::cors_layer(&args.frontend_url))
        .layer(TraceLayer::new_for_http());

    let addr = args.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {} (try --port <PORT>)", addr))?;

    println!();
    println!("  Git Editor API");
    println!();
    println!("  Server:       http://{}", addr);
    println!("  Health check: http://{}/health", addr);
    println!("  Login:        http://{}/auth/github/login", addr);
    println!("  Frontend:     {}", args.frontend_url);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        println!("\n  Shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn workspace_for(
    provider: Arc<dyn ContentProvider>,
    args: &ProviderArgs,
    repo: &str,
) -> anyhow::Result<Workspace> {
    let session = match args.credential() {
        Some(credential) => Session::authenticate(provider.as_ref(), credential).await?,
        None => Session::anonymous(),
    };
    let repo: RepoRef = repo.parse()?;

    let mut workspace = Workspace::new(provider, session, args.autosave_delay());
    workspace.select_repository(&repo).await?;
    Ok(workspace)
}

async fn print_tree(
    provider: Arc<dyn ContentProvider>,
    args: &ProviderArgs,
    repo: &str,
    path: &str,
    depth: usize,
) -> anyhow::Result<()> {
    let workspace = workspace_for(provider, args, repo).await?;

    enum Step {
        Expand(String, usize),
        Print(String),
    }

    // Pre-order walk; children are pushed in reverse so they pop in listing order
    let mut pending = vec![Step::Expand(path.to_string(), 0)];
    while let Some(step) = pending.pop() {
        match step {
            Step::Print(line) => println!("{}", line),
            Step::Expand(dir, level) => {
                let listing = workspace.expand(&dir).await?;
                let indent = "  ".repeat(level);
                for entry in listing.iter().rev() {
                    if entry.is_dir() {
                        if level + 1 < depth {
                            pending.push(Step::Expand(entry.path.clone(), level + 1));
                        }
                        pending.push(Step::Print(format!("{}{}/", indent, entry.name)));
                    } else {
                        pending.push(Step::Print(format!("{}{}", indent, entry.name)));
                    }
                }
            }
        }
    }
    Ok(())
}

async fn open(
    provider: Arc<dyn ContentProvider>,
    args: &ProviderArgs,
    repo: &str,
    path: &str,
) -> anyhow::Result<()> {
    if let Err(AppError::UnsupportedFileType(name)) = document::dialect_for_path(path) {
        println!("{} is not editable: only .md .markdown .txt .json .yml .yaml .xml", name);
        return Ok(());
    }

    let mut workspace = workspace_for(provider, args, repo).await?;
    let editable = workspace.open(path).await?.is_editable();
    let doc = workspace.document().await?;

    let output = json!({
        "path": doc.path(),
        "dialect": doc.dialect(),
        "sha": doc.version_token(),
        "editable": editable,
        "document": doc.document(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn put(
    provider: Arc<dyn ContentProvider>,
    args: &ProviderArgs,
    repo: &str,
    path: &str,
    from: &std::path::Path,
) -> anyhow::Result<()> {
    if args.credential().is_none() {
        bail!("put needs a token (--token or GITHUB_TOKEN)");
    }
    let dialect: Dialect = document::dialect_for_path(path)?;
    let raw = tokio::fs::read_to_string(from)
        .await
        .with_context(|| format!("failed to read {}", from.display()))?;

    let mut workspace = workspace_for(provider, args, repo).await?;
    let status = match workspace.open(path).await? {
        OpenFile::ReadOnly(_) => bail!("{} is read-only for this token", path),
        OpenFile::Editable(handle) => {
            handle.edit(document::decode(&raw, dialect))?;
            handle.save().await?
        }
    };

    if let Some(e) = status.last_error {
        bail!("saving {} failed: {}", path, e);
    }
    match status.last_saved {
        Some(_) => println!("Saved {} at {}", path, status.version_token),
        None => println!("{} is unchanged", path),
    }
    workspace.close_file();
    Ok(())
}
