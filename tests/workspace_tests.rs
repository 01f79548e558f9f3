mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeProvider, OTHER_TOKEN, OWNER_TOKEN, credential, repo_ref};
use git_editor::autosave::SaveState;
use git_editor::document::{Block, Dialect, Inline, RichDocument};
use git_editor::error::AppError;
use git_editor::session::{Access, Session};
use git_editor::workspace::Workspace;

const DELAY: Duration = Duration::from_secs(2);

fn seeded() -> Arc<FakeProvider> {
    FakeProvider::new()
        .with_file("README.md", "# Notes")
        .with_file("docs/intro.md", "hello")
        .with_file("image.png", "not really a png")
        .into_arc()
}

async fn session(provider: &Arc<FakeProvider>, token: &str) -> Session {
    Session::authenticate(provider.as_ref(), credential(token))
        .await
        .unwrap()
}

async fn workspace(provider: &Arc<FakeProvider>, session: Session) -> Workspace {
    let mut workspace = Workspace::new(provider.clone(), session, DELAY);
    workspace.select_repository(&repo_ref()).await.unwrap();
    workspace
}

#[tokio::test]
async fn unsupported_extension_is_rejected_before_fetching() {
    let provider = seeded();
    let mut ws = workspace(&provider, Session::anonymous()).await;

    let err = ws.open("image.png").await.err().unwrap();
    assert_eq!(err, AppError::UnsupportedFileType("image.png".to_string()));
    assert_eq!(provider.reads(), 0);
    assert!(ws.open_file().is_none());
}

#[tokio::test]
async fn anonymous_and_non_owner_sessions_are_read_only() {
    let provider = seeded();

    let mut anonymous = workspace(&provider, Session::anonymous()).await;
    assert_eq!(anonymous.access(), Some(Access::ReadOnly));
    assert!(!anonymous.open("README.md").await.unwrap().is_editable());

    let other = session(&provider, OTHER_TOKEN).await;
    let mut ws = workspace(&provider, other).await;
    assert_eq!(ws.access(), Some(Access::ReadOnly));
    let opened = ws.open("docs/intro.md").await.unwrap();
    assert!(!opened.is_editable());

    let err = ws.edit(RichDocument::default()).unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(ws.save_status().is_none());

    let err = ws
        .create_file("new.md", "x".to_string(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(provider.write_count(), 0);
}

#[tokio::test]
async fn nothing_works_before_a_repository_is_selected() {
    let provider = seeded();
    let mut ws = Workspace::new(provider.clone(), Session::anonymous(), DELAY);

    assert!(matches!(ws.expand("").await, Err(AppError::BadRequest(_))));
    assert!(matches!(ws.open("README.md").await, Err(AppError::BadRequest(_))));
    assert!(matches!(ws.save().await, Err(AppError::BadRequest(_))));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn owner_edits_and_saves() {
    let provider = seeded();
    let owner = session(&provider, OWNER_TOKEN).await;
    let mut ws = workspace(&provider, owner).await;
    assert_eq!(ws.access(), Some(Access::Owner));

    let opened = ws.open("/README.md").await.unwrap();
    assert!(opened.is_editable());
    assert_eq!(opened.path(), "README.md");

    let mut document = ws.document().await.unwrap().document().clone();
    document.blocks.push(Block::paragraph(vec![Inline::text("More text")]));
    ws.edit(document).unwrap();

    let status = ws.save().await.unwrap();
    assert_eq!(status.state, SaveState::Clean);
    assert_eq!(provider.content("README.md").unwrap(), "# Notes\n\nMore text");
    assert_eq!(
        provider.writes()[0].1.message.as_deref(),
        Some("Update README.md")
    );

    let reopened = ws.document().await.unwrap();
    assert_eq!(reopened.dialect(), Dialect::Markdown);
    assert!(!reopened.is_dirty());
    assert_eq!(reopened.version_token(), provider.sha("README.md").unwrap());
}

#[tokio::test]
async fn create_file_refreshes_parent_listing() {
    let provider = seeded();
    let owner = session(&provider, OWNER_TOKEN).await;
    let ws = workspace(&provider, owner).await;

    assert_eq!(ws.expand("docs").await.unwrap().len(), 1);
    ws.create_file("docs/new.md", "fresh".to_string(), None)
        .await
        .unwrap();

    let listing = ws.expand("docs").await.unwrap();
    let names: Vec<&str> = listing.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["intro.md", "new.md"]);
    assert_eq!(provider.lists(), 2);

    let err = ws
        .create_file("docs/new.md", "again".to_string(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyExists(_)));
}

#[tokio::test]
async fn deleting_the_open_file_closes_it() {
    let provider = seeded();
    let owner = session(&provider, OWNER_TOKEN).await;
    let mut ws = workspace(&provider, owner).await;

    ws.expand("docs").await.unwrap();
    ws.open("docs/intro.md").await.unwrap();
    let sha = provider.sha("docs/intro.md").unwrap();

    let commit = ws.delete_file("docs/intro.md", sha, None).await.unwrap();
    assert_eq!(commit.message, "Delete docs/intro.md");
    assert!(ws.open_file().is_none());
    assert!(!ws.tree().unwrap().is_loaded("docs"));
    assert!(ws.expand("docs").await.unwrap().is_empty());
}

#[tokio::test]
async fn selecting_another_repository_resets_state() {
    let provider = seeded();
    let owner = session(&provider, OWNER_TOKEN).await;
    let mut ws = workspace(&provider, owner).await;

    ws.expand("").await.unwrap();
    ws.open("README.md").await.unwrap();

    ws.select_repository(&repo_ref()).await.unwrap();
    assert!(ws.open_file().is_none());
    assert!(ws.tree().unwrap().loaded_paths().is_empty());

    let err = ws
        .select_repository(&git_editor::models::RepoRef::new("octocat", "missing"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn logout_drops_everything() {
    let provider = seeded();
    let owner = session(&provider, OWNER_TOKEN).await;
    let mut ws = workspace(&provider, owner).await;
    ws.open("README.md").await.unwrap();

    ws.logout();
    assert!(ws.session().is_anonymous());
    assert!(ws.session().identity().is_none());
    assert!(ws.repository().is_none());
    assert!(ws.open_file().is_none());
}
