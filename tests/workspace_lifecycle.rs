use std::{fs, path::PathBuf};

use gdnotes::{
    Config, GdError, NoteContent, NoteContentSnippet, NoteMetadata, VcsAuthor, VcsGateway,
    Workspace, WorkspaceState, NOTES_PLACEHOLDER_FILE_NAME, WORKSPACE_ALREADY_EXISTS,
};
use tempfile::TempDir;

fn author() -> VcsAuthor {
    VcsAuthor {
        name: "Origin".into(),
        email: "origin@example.com".into(),
    }
}

#[tokio::test]
async fn create_workspace_sets_up_directories_then_repository() {
    let tmp = TempDir::new().unwrap();
    let config = Config::with_root(tmp.path().join("data"));
    let mut workspace = Workspace::new(config.clone());

    assert!(!workspace.is_ready().await);
    workspace.create_workspace_repository().await.unwrap();

    assert!(config.workspace_dir().is_dir());
    assert!(config.notes_dir().is_dir());
    assert!(config.notes_dir().join(NOTES_PLACEHOLDER_FILE_NAME).exists());
    assert!(VcsGateway::new().repository_exists(&config.workspace_dir()).await);
    assert!(config.workspace_info_path().exists());

    assert_eq!(workspace.state(), WorkspaceState::Ready);
    assert!(workspace.is_ready().await);

    // the placeholder is committed, so the tree starts clean
    assert!(workspace.file_statuses().await.unwrap().is_empty());
}

#[tokio::test]
async fn second_setup_reports_existing_workspace() {
    let tmp = TempDir::new().unwrap();
    let config = Config::with_root(tmp.path());
    Workspace::new(config.clone())
        .create_workspace_repository()
        .await
        .unwrap();

    let mut again = Workspace::new(config);
    let err = again.create_workspace_repository().await.unwrap_err();
    assert!(matches!(err, GdError::WorkspaceAlreadyExists { .. }));
    assert_eq!(err.code(), Some(WORKSPACE_ALREADY_EXISTS));
    assert_eq!(
        err.to_string(),
        "Workspace already exists and is not an empty directory"
    );
}

#[tokio::test]
async fn clone_creates_missing_notes_directory() {
    let origin = TempDir::new().unwrap();
    let vcs = VcsGateway::new();
    vcs.create_repository(origin.path()).await.unwrap();
    fs::write(origin.path().join("README.md"), "diary").unwrap();
    vcs.commit(origin.path(), "init", &[PathBuf::from("README.md")], &author())
        .await
        .unwrap();

    let tmp = TempDir::new().unwrap();
    let config = Config::with_root(tmp.path().join("data"));
    let mut workspace = Workspace::new(config.clone());

    let url = origin.path().to_string_lossy().into_owned();
    workspace.clone_remote_repository(&url, None).await.unwrap();

    assert!(config.workspace_dir().join("README.md").exists());
    assert!(config.notes_dir().is_dir());
    assert_eq!(workspace.state(), WorkspaceState::Ready);
}

#[tokio::test]
async fn clone_of_unreachable_remote_is_not_silent() {
    let tmp = TempDir::new().unwrap();
    let mut workspace = Workspace::new(Config::with_root(tmp.path()));

    let missing = tmp.path().join("no-such-remote");
    let result = workspace
        .clone_remote_repository(&missing.to_string_lossy(), None)
        .await;

    assert!(result.is_err());
    assert_ne!(workspace.state(), WorkspaceState::Ready);
}

#[tokio::test]
async fn notes_and_commits_flow_through_workspace() {
    let tmp = TempDir::new().unwrap();
    let mut workspace = Workspace::new(Config::with_root(tmp.path()));
    workspace.create_workspace_repository().await.unwrap();

    let metadata = NoteMetadata::new("Learning git2", vec!["rust".into()]);
    let content = NoteContent::new(
        metadata.id.clone(),
        vec![
            NoteContentSnippet::text("Notes on libgit2"),
            NoteContentSnippet::code("Repository::init(path)?;", Some("rust".into()), None),
        ],
    );
    let note_dir = workspace
        .storage()
        .create_note(&metadata, &content)
        .await
        .unwrap();

    let statuses = workspace.file_statuses().await.unwrap();
    assert_eq!(statuses.len(), 2);
    assert!(statuses.iter().all(|s| s.is_new && !s.is_modified));

    let relative = note_dir
        .strip_prefix(workspace.workspace_dir())
        .unwrap()
        .to_path_buf();
    workspace
        .commit_changes(
            "Add note",
            &[relative.join("meta.json"), relative.join("content.json")],
        )
        .await
        .unwrap();
    assert!(workspace.file_statuses().await.unwrap().is_empty());

    let mut updated = workspace.storage().read_note_content(&note_dir).await.unwrap();
    updated.snippets.push(NoteContentSnippet::text("More"));
    workspace.storage().write_note_content(&updated).await.unwrap();

    let statuses = workspace.file_statuses().await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert!(statuses[0].is_modified);
    assert!(statuses[0].file_name.ends_with("content.json"));
}
