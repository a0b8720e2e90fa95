//! CLI module for the gdnotes application
//!
//! This module handles the command-line interface for interacting with the
//! workspace.
use std::{
    ffi::OsStr,
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::DateTime;
use console::style;
use log::{debug, info};
use tokio::sync::Mutex;

use crate::{
    fs_gateway, layout, parse_stacks, sort_by_recent, Commands, ErrorSink, GdError, NoteContent, NoteContentSnippet,
    NoteMetadata, Result, SnippetType, Theme, VcsAuthentication, VcsFileStatus, VcsWorker,
    Workspace,
};

/// CLI Application handler - processes CLI commands against the workspace
pub struct App {
    /// The workspace coordinator
    workspace: Arc<Mutex<Workspace>>,

    /// Background git worker used for status queries
    worker: VcsWorker,

    /// Receives every error that reaches the user
    sink: Arc<dyn ErrorSink>,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    pub fn new(workspace: Workspace, sink: Arc<dyn ErrorSink>, verbose: bool) -> Self {
        Self {
            workspace: Arc::new(Mutex::new(workspace)),
            worker: VcsWorker::new(Arc::clone(&sink)),
            sink,
            verbose,
        }
    }

    /// Run the CLI application with the given command
    pub async fn run(&mut self, command: Commands) -> Result<()> {
        self.worker.start();
        let result = self.dispatch(command).await;
        self.worker.stop().await?;

        if let Err(e) = &result {
            self.sink.report("cli", e);
        }
        result
    }

    async fn dispatch(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Init => self.handle_init().await,
            Commands::Clone {
                url,
                username,
                password,
                token,
            } => {
                let authentication = match (username, password, token) {
                    (_, _, Some(token)) => Some(VcsAuthentication::OAuth2Token { token }),
                    (Some(username), Some(password), None) => {
                        Some(VcsAuthentication::Basic { username, password })
                    }
                    _ => None,
                };
                self.handle_clone(url, authentication).await
            }
            Commands::Status => self.handle_status().await,
            Commands::List { json } => self.handle_list(json).await,
            Commands::New {
                title,
                stacks,
                text,
            } => self.handle_new(title, stacks, text).await,
            Commands::Show { name, json } => self.handle_show(name, json).await,
            Commands::Delete { name, force } => self.handle_delete(name, force).await,
            Commands::Commit { message, files } => self.handle_commit(message, files).await,
            Commands::Theme { theme } => self.handle_theme(theme).await,
        }
    }

    async fn require_ready(&self) -> Result<()> {
        let mut workspace = self.workspace.lock().await;
        if workspace.is_ready().await {
            Ok(())
        } else {
            Err(GdError::WorkspaceNotReady {
                path: workspace.workspace_dir(),
            })
        }
    }

    async fn handle_init(&self) -> Result<()> {
        let mut workspace = self.workspace.lock().await;
        workspace.create_workspace_repository().await?;
        println!(
            "Workspace created at {}",
            workspace.workspace_dir().display()
        );
        Ok(())
    }

    async fn handle_clone(
        &self,
        url: String,
        authentication: Option<VcsAuthentication>,
    ) -> Result<()> {
        println!("Cloning {} ...", url);
        let mut workspace = self.workspace.lock().await;
        workspace
            .clone_remote_repository(&url, authentication)
            .await?;
        println!(
            "Workspace cloned into {}",
            workspace.workspace_dir().display()
        );
        Ok(())
    }

    async fn handle_status(&self) -> Result<()> {
        self.require_ready().await?;
        let workspace_dir = self.workspace.lock().await.workspace_dir();

        let statuses = self.worker.get_file_statuses(workspace_dir).await?;
        let visible: Vec<&VcsFileStatus> = statuses
            .iter()
            .filter(|s| self.verbose || !s.is_ignored)
            .collect();

        if visible.is_empty() {
            println!("Nothing to commit, workspace clean");
            return Ok(());
        }

        for status in visible {
            let label = format!("{:>9}", status.label());
            let label = if status.is_new {
                style(label).green()
            } else if status.is_deleted {
                style(label).red()
            } else if status.is_renamed {
                style(label).cyan()
            } else if status.is_ignored {
                style(label).dim()
            } else {
                style(label).yellow()
            };
            println!("{}  {}", label, status.file_name);
        }
        Ok(())
    }

    async fn handle_list(&self, json: bool) -> Result<()> {
        self.require_ready().await?;
        let storage = self.workspace.lock().await.storage().clone();

        let mut notes = storage.read_note_metadata_collection().await?;
        sort_by_recent(&mut notes);
        debug!("Listing {} notes", notes.len());

        if json {
            println!("{}", serde_json::to_string_pretty(&notes)?);
            return Ok(());
        }

        if notes.is_empty() {
            println!("No notes yet.");
            return Ok(());
        }

        for note in &notes {
            let dir_name = note
                .note_path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            println!(
                "{}  {}  {}",
                style(format_millis(note.updated_datetime)).dim(),
                style(&note.title).bold(),
                style(dir_name).dim()
            );
            if !note.stacks.is_empty() {
                println!("    [{}]", note.stacks.join(", "));
            }
        }
        Ok(())
    }

    async fn handle_new(
        &self,
        title: String,
        stacks: Option<String>,
        text: Option<String>,
    ) -> Result<()> {
        self.require_ready().await?;
        let storage = self.workspace.lock().await.storage().clone();

        let metadata = NoteMetadata::new(title, parse_stacks(stacks));
        let content = NoteContent::new(
            metadata.id.clone(),
            vec![NoteContentSnippet::text(text.unwrap_or_default())],
        );

        let note_dir = storage.create_note(&metadata, &content).await?;
        info!("Created note {}", metadata.id);
        println!(
            "Note created: {}",
            note_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
        Ok(())
    }

    async fn load_note(&self, name: &str) -> Result<(NoteMetadata, NoteContent)> {
        let storage = self.workspace.lock().await.storage().clone();
        let note_dir = storage.notes_dir().join(name);

        let not_found = || GdError::NoteNotFound {
            id: name.to_string(),
        };
        let metadata = storage
            .read_note_metadata(&note_dir)
            .await
            .ok_or_else(not_found)?;
        let content = storage
            .read_note_content(&note_dir)
            .await
            .ok_or_else(not_found)?;
        Ok((metadata, content))
    }

    async fn handle_show(&self, name: String, json: bool) -> Result<()> {
        self.require_ready().await?;
        let (metadata, content) = self.load_note(&name).await?;

        if json {
            let value = serde_json::json!({
                "metadata": metadata,
                "content": content,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        println!("{}", style(&metadata.title).bold());
        if !metadata.stacks.is_empty() {
            println!("Stacks:  {}", metadata.stacks.join(", "));
        }
        println!("Created: {}", format_millis(metadata.created_datetime));
        println!("Updated: {}", format_millis(metadata.updated_datetime));

        for snippet in &content.snippets {
            println!();
            match snippet.kind {
                SnippetType::Text => println!("{}", snippet.value),
                SnippetType::Code => {
                    if let Some(file_name) = &snippet.file_name {
                        println!("{}", style(file_name).dim());
                    }
                    println!("```{}", snippet.language.as_deref().unwrap_or(""));
                    println!("{}", snippet.value);
                    println!("```");
                }
            }
        }
        Ok(())
    }

    async fn handle_delete(&self, name: String, force: bool) -> Result<()> {
        self.require_ready().await?;
        let storage = self.workspace.lock().await.storage().clone();

        let is_single_component = Path::new(&name).file_name() == Some(OsStr::new(&name));
        let note_dir = storage.notes_dir().join(&name);
        if !is_single_component
            || !layout::is_note_dir_name(&name)
            || !fs_gateway::is_directory(&note_dir).await
        {
            return Err(GdError::NoteNotFound { id: name });
        }

        // Broken metadata must not make a note undeletable.
        let metadata = storage.read_note_metadata(&note_dir).await;
        let label = metadata
            .as_ref()
            .map(|m| m.title.clone())
            .unwrap_or_else(|| name.clone());

        if !force {
            println!("You are about to delete the following note:");
            match &metadata {
                Some(metadata) => {
                    println!("Title:   {}", metadata.title);
                    println!("Created: {}", format_millis(metadata.created_datetime));
                }
                None => println!("Directory: {} (unreadable metadata)", name),
            }

            print!("Are you sure you want to delete this note? [y/N]: ");
            stdout().flush()?;

            let mut input = String::new();
            stdin().read_line(&mut input)?;

            let input = input.trim().to_lowercase();
            if input != "y" && input != "yes" {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        storage.delete_note(&note_dir).await?;
        println!("Note '{}' has been deleted.", label);
        Ok(())
    }

    async fn handle_commit(&self, message: String, files: Vec<PathBuf>) -> Result<()> {
        self.require_ready().await?;
        let oid = self
            .workspace
            .lock()
            .await
            .commit_changes(&message, &files)
            .await?;
        println!("Committed {}", &oid[..oid.len().min(10)]);
        Ok(())
    }

    async fn handle_theme(&self, theme: Option<String>) -> Result<()> {
        let workspace = self.workspace.lock().await;
        let mut info = workspace.read_workspace_info().await;

        match theme.as_deref() {
            None => {}
            Some("dark") => info.theme = Theme::Dark,
            Some(_) => info.theme = Theme::Light,
        }
        if theme.is_some() {
            workspace.update_workspace_info(&info).await?;
        }

        println!(
            "Theme: {}",
            match info.theme {
                Theme::Light => "light",
                Theme::Dark => "dark",
            }
        );
        Ok(())
    }
}

fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown time".to_string())
}
