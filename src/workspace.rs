use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::{
    classify_all, fs_gateway, Config, GdError, NoteStorage, RepositoryHandle, Result,
    VcsAuthentication, VcsFileStatus, VcsGateway, WorkspaceInfo,
};

/// Placeholder committed so git tracks the otherwise empty notes directory.
pub const NOTES_PLACEHOLDER_FILE_NAME: &str = ".gitkeep";
pub const INITIAL_COMMIT_MESSAGE: &str = "Initial Commit";

/// Lifecycle of the workspace. Once `Ready`, it stays `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    Uninitialized,
    NeedsSetup,
    Ready,
}

/// Ties the note storage and the git backend together for one workspace.
///
/// Owns the single cached repository handle; it is opened lazily and only
/// replaced when a caller asks for a forced reopen.
#[derive(Debug)]
pub struct Workspace {
    config: Config,
    vcs: VcsGateway,
    storage: NoteStorage,
    state: WorkspaceState,
    repository: Option<RepositoryHandle>,
}

impl Workspace {
    pub fn new(config: Config) -> Self {
        let storage = NoteStorage::new(config.notes_dir());
        Self {
            config,
            vcs: VcsGateway::new(),
            storage,
            state: WorkspaceState::Uninitialized,
            repository: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &NoteStorage {
        &self.storage
    }

    pub fn state(&self) -> WorkspaceState {
        self.state
    }

    pub fn workspace_dir(&self) -> PathBuf {
        self.config.workspace_dir()
    }

    /// Checks whether the workspace repository exists.
    pub async fn is_ready(&mut self) -> bool {
        if self.state == WorkspaceState::Ready {
            return true;
        }

        let exists = self.vcs.repository_exists(&self.workspace_dir()).await;
        self.state = if exists {
            WorkspaceState::Ready
        } else {
            WorkspaceState::NeedsSetup
        };
        debug!("Workspace state: {:?}", self.state);
        exists
    }

    /// Creates a fresh workspace: directories first, then the repository and
    /// its initial commit.
    pub async fn create_workspace_repository(&mut self) -> Result<()> {
        let workspace_dir = self.workspace_dir();
        self.guard_not_existing(&workspace_dir).await?;

        info!("Creating workspace at {}", workspace_dir.display());
        fs_gateway::ensure_directory(&workspace_dir).await?;
        fs_gateway::ensure_directory(self.storage.notes_dir()).await?;

        let placeholder = self.storage.notes_dir().join(NOTES_PLACEHOLDER_FILE_NAME);
        fs_gateway::write_file(&placeholder, "").await?;

        let handle = self.vcs.create_repository(&workspace_dir).await?;
        let tracked = relative_to(&placeholder, &workspace_dir)?;
        self.vcs
            .commit_in(&handle, INITIAL_COMMIT_MESSAGE, &[tracked], &self.config.author())
            .await?;

        self.ensure_workspace_info().await?;
        self.mark_ready(handle);
        info!("Workspace created");
        Ok(())
    }

    /// Clones a remote workspace, then makes sure the notes directory exists
    /// since git does not carry empty directories.
    pub async fn clone_remote_repository(
        &mut self,
        remote_url: &str,
        authentication: Option<VcsAuthentication>,
    ) -> Result<()> {
        let workspace_dir = self.workspace_dir();
        self.guard_not_existing(&workspace_dir).await?;

        if let Some(parent) = workspace_dir.parent() {
            fs_gateway::ensure_directory(parent).await?;
        }

        let handle = self
            .vcs
            .clone_repository(remote_url, &workspace_dir, authentication)
            .await?;
        fs_gateway::ensure_directory(self.storage.notes_dir()).await?;

        self.ensure_workspace_info().await?;
        self.mark_ready(handle);
        info!("Workspace cloned from {}", remote_url);
        Ok(())
    }

    /// Returns the cached repository handle, opening it on first use or when
    /// `force_reopen` is set.
    pub async fn repository(&mut self, force_reopen: bool) -> Result<RepositoryHandle> {
        if force_reopen || self.repository.is_none() {
            let workspace_dir = self.workspace_dir();
            let handle = self
                .vcs
                .open_repository(&workspace_dir)
                .await
                .map_err(|e| {
                    warn!("Workspace repository unavailable: {}", e);
                    GdError::WorkspaceNotReady {
                        path: workspace_dir.clone(),
                    }
                })?;
            self.mark_ready(handle);
        }

        self.repository
            .clone()
            .ok_or_else(|| GdError::WorkspaceNotReady {
                path: self.workspace_dir(),
            })
    }

    /// Current working-tree status of every path in the workspace.
    pub async fn file_statuses(&mut self) -> Result<Vec<VcsFileStatus>> {
        let handle = self.repository(false).await?;
        let entries = self.vcs.get_file_statuses(&handle).await?;
        Ok(classify_all(&entries))
    }

    /// Commits an explicit list of workspace-relative paths.
    pub async fn commit_changes(&mut self, message: &str, files: &[PathBuf]) -> Result<String> {
        let handle = self.repository(false).await?;
        self.vcs
            .commit_in(&handle, message, files, &self.config.author())
            .await
    }

    /// Reads the workspace settings; absent or unreadable means defaults.
    pub async fn read_workspace_info(&self) -> WorkspaceInfo {
        let path = self.config.workspace_info_path();
        let parsed: Result<WorkspaceInfo> = match fs_gateway::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw).map_err(GdError::from),
            Err(e) => Err(e),
        };

        parsed.unwrap_or_else(|e| {
            debug!("Using default workspace info ({})", e);
            WorkspaceInfo::default()
        })
    }

    pub async fn update_workspace_info(&self, info: &WorkspaceInfo) -> Result<()> {
        fs_gateway::ensure_directory(&self.config.root_dir).await?;
        let raw = serde_json::to_string_pretty(info)?;
        fs_gateway::write_file(&self.config.workspace_info_path(), raw).await
    }

    /// Drops the cached repository handle.
    pub fn close(&mut self) {
        if self.repository.take().is_some() {
            debug!("Released workspace repository handle");
        }
    }

    async fn guard_not_existing(&mut self, workspace_dir: &Path) -> Result<()> {
        if self.vcs.repository_exists(workspace_dir).await {
            warn!("Workspace already exists at {}", workspace_dir.display());
            self.state = WorkspaceState::Ready;
            return Err(GdError::WorkspaceAlreadyExists {
                path: workspace_dir.to_path_buf(),
            });
        }
        Ok(())
    }

    async fn ensure_workspace_info(&self) -> Result<()> {
        if fs_gateway::exists(&self.config.workspace_info_path()).await {
            return Ok(());
        }
        self.update_workspace_info(&WorkspaceInfo::default()).await
    }

    fn mark_ready(&mut self, handle: RepositoryHandle) {
        self.repository = Some(handle);
        self.state = WorkspaceState::Ready;
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.close();
    }
}

fn relative_to(path: &Path, base: &Path) -> Result<PathBuf> {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .map_err(|_| GdError::DirectoryError {
            path: path.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Theme;
    use tempfile::TempDir;

    #[tokio::test]
    async fn starts_uninitialized_then_needs_setup() {
        let tmp = TempDir::new().unwrap();
        let mut workspace = Workspace::new(Config::with_root(tmp.path()));
        assert_eq!(workspace.state(), WorkspaceState::Uninitialized);

        assert!(!workspace.is_ready().await);
        assert_eq!(workspace.state(), WorkspaceState::NeedsSetup);
    }

    #[tokio::test]
    async fn repository_before_setup_is_not_ready() {
        let tmp = TempDir::new().unwrap();
        let mut workspace = Workspace::new(Config::with_root(tmp.path()));
        assert!(matches!(
            workspace.repository(false).await,
            Err(GdError::WorkspaceNotReady { .. })
        ));
    }

    #[tokio::test]
    async fn workspace_info_defaults_then_updates() {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::new(Config::with_root(tmp.path()));
        assert_eq!(workspace.read_workspace_info().await, WorkspaceInfo::default());

        let info = WorkspaceInfo { theme: Theme::Dark };
        workspace.update_workspace_info(&info).await.unwrap();
        assert_eq!(workspace.read_workspace_info().await, info);
    }

    #[tokio::test]
    async fn close_releases_handle_and_reopen_works() {
        let tmp = TempDir::new().unwrap();
        let mut workspace = Workspace::new(Config::with_root(tmp.path()));
        workspace.create_workspace_repository().await.unwrap();

        workspace.close();
        let handle = workspace.repository(false).await.unwrap();
        assert_eq!(handle.path(), workspace.workspace_dir().as_path());
        assert!(workspace.repository(true).await.is_ok());
    }
}
