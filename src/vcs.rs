//! Bridge to the git backend.
//!
//! All libgit2 calls are blocking, so each operation runs on tokio's blocking
//! pool. Repository handles are not pooled here; whoever opens one owns it.
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use git2::{
    build::RepoBuilder, Cred, ErrorClass, FetchOptions, RemoteCallbacks, Repository, Signature,
    Status, StatusOptions,
};
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::{GdError, Result};

/// Identity recorded on commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsAuthor {
    pub name: String,
    pub email: String,
}

/// Credentials offered to the remote during clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VcsAuthentication {
    Basic { username: String, password: String },
    #[serde(rename = "oauth2-token")]
    OAuth2Token { token: String },
}

/// An open repository. Cloning the handle shares the same repository.
#[derive(Clone)]
pub struct RepositoryHandle {
    path: PathBuf,
    repo: Arc<Mutex<Repository>>,
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("path", &self.path)
            .finish()
    }
}

impl RepositoryHandle {
    fn new(path: PathBuf, repo: Repository) -> Self {
        Self {
            path,
            repo: Arc::new(Mutex::new(repo)),
        }
    }

    /// Directory the repository was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` with exclusive access to the repository on the blocking pool.
    async fn with_repo<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Repository) -> Result<T> + Send + 'static,
    {
        let repo = Arc::clone(&self.repo);
        task::spawn_blocking(move || {
            let guard = repo.lock().map_err(|_| {
                GdError::Git(git2::Error::from_str("repository handle lock poisoned"))
            })?;
            f(&guard)
        })
        .await
        .map_err(join_error)?
    }
}

/// Working-tree state of one path, with the backend's bit flags hidden
/// behind named predicates.
pub trait StatusEntry {
    fn path(&self) -> &str;
    /// Raw backend bitfield, passed through untouched.
    fn status_bits(&self) -> u32;
    fn is_new(&self) -> bool;
    fn is_modified(&self) -> bool;
    fn is_deleted(&self) -> bool;
    fn is_renamed(&self) -> bool;
    fn is_ignored(&self) -> bool;
}

/// Owned copy of a libgit2 status entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitStatusEntry {
    pub path: String,
    pub status: Status,
}

impl StatusEntry for GitStatusEntry {
    fn path(&self) -> &str {
        &self.path
    }

    fn status_bits(&self) -> u32 {
        self.status.bits()
    }

    fn is_new(&self) -> bool {
        self.status.intersects(Status::INDEX_NEW | Status::WT_NEW)
    }

    fn is_modified(&self) -> bool {
        self.status.intersects(
            Status::INDEX_MODIFIED
                | Status::WT_MODIFIED
                | Status::INDEX_TYPECHANGE
                | Status::WT_TYPECHANGE,
        )
    }

    fn is_deleted(&self) -> bool {
        self.status.intersects(Status::INDEX_DELETED | Status::WT_DELETED)
    }

    fn is_renamed(&self) -> bool {
        self.status.intersects(Status::INDEX_RENAMED | Status::WT_RENAMED)
    }

    fn is_ignored(&self) -> bool {
        self.status.contains(Status::IGNORED)
    }
}

/// Gateway over libgit2.
#[derive(Debug, Clone, Default)]
pub struct VcsGateway;

impl VcsGateway {
    pub fn new() -> Self {
        Self
    }

    /// True if a repository can be opened at `dir`. Any open failure,
    /// including permission errors, counts as "no repository".
    pub async fn repository_exists(&self, dir: &Path) -> bool {
        let dir = dir.to_path_buf();
        let opened = task::spawn_blocking(move || Repository::open(&dir).is_ok()).await;
        opened.unwrap_or(false)
    }

    /// Initializes a new repository at `dir`.
    pub async fn create_repository(&self, dir: &Path) -> Result<RepositoryHandle> {
        let path = dir.to_path_buf();
        info!("Initializing repository at {}", path.display());

        let repo = task::spawn_blocking({
            let path = path.clone();
            move || Repository::init(&path)
        })
        .await
        .map_err(join_error)??;

        Ok(RepositoryHandle::new(path, repo))
    }

    /// Opens the existing repository at `dir`.
    pub async fn open_repository(&self, dir: &Path) -> Result<RepositoryHandle> {
        let path = dir.to_path_buf();
        debug!("Opening repository at {}", path.display());

        let repo = task::spawn_blocking({
            let path = path.clone();
            move || Repository::open(&path)
        })
        .await
        .map_err(join_error)?
        .map_err(|e| {
            warn!("Failed to open repository {}: {}", path.display(), e);
            GdError::Git(e)
        })?;

        Ok(RepositoryHandle::new(path, repo))
    }

    /// Clones `remote_url` into `dir`.
    ///
    /// Failures are classified into authentication and connection errors
    /// from the backend message; anything else passes through.
    pub async fn clone_repository(
        &self,
        remote_url: &str,
        dir: &Path,
        authentication: Option<VcsAuthentication>,
    ) -> Result<RepositoryHandle> {
        let path = dir.to_path_buf();
        let url = remote_url.to_string();
        info!("Cloning {} into {}", url, path.display());

        let cloned = task::spawn_blocking({
            let path = path.clone();
            move || {
                let mut builder = RepoBuilder::new();
                builder.fetch_options(fetch_options(authentication));
                builder.clone(&url, &path)
            }
        })
        .await
        .map_err(join_error)?;

        match cloned {
            Ok(repo) => {
                info!("Clone finished: {}", path.display());
                Ok(RepositoryHandle::new(path, repo))
            }
            Err(e) => {
                error!("Clone of {} failed: {}", remote_url, e);
                Err(classify_clone_error(e, &path))
            }
        }
    }

    /// Stages exactly `file_changes` (relative to the workdir) in the
    /// repository at `workspace_dir` and commits them.
    pub async fn commit(
        &self,
        workspace_dir: &Path,
        message: &str,
        file_changes: &[PathBuf],
        author: &VcsAuthor,
    ) -> Result<String> {
        let handle = self.open_repository(workspace_dir).await?;
        self.commit_in(&handle, message, file_changes, author).await
    }

    /// Same as [`VcsGateway::commit`] on an already open handle.
    pub async fn commit_in(
        &self,
        handle: &RepositoryHandle,
        message: &str,
        file_changes: &[PathBuf],
        author: &VcsAuthor,
    ) -> Result<String> {
        let message = message.to_string();
        let files = file_changes.to_vec();
        let author = author.clone();

        let oid = handle
            .with_repo(move |repo| commit_files(repo, &message, &files, &author))
            .await?;
        info!("Committed {} in {}", oid, handle.path().display());
        Ok(oid)
    }

    /// Enumerates the working-tree status of the repository.
    pub async fn get_file_statuses(
        &self,
        handle: &RepositoryHandle,
    ) -> Result<Vec<GitStatusEntry>> {
        handle
            .with_repo(|repo| {
                let mut options = StatusOptions::new();
                options
                    .include_untracked(true)
                    .recurse_untracked_dirs(true)
                    .include_ignored(true)
                    .renames_head_to_index(true);

                let statuses = repo.statuses(Some(&mut options))?;
                let entries: Vec<GitStatusEntry> = statuses
                    .iter()
                    .map(|entry| GitStatusEntry {
                        path: status_path(&entry),
                        status: entry.status(),
                    })
                    .collect();

                trace!("Repository reported {} status entries", entries.len());
                Ok(entries)
            })
            .await
    }
}

/// Path reported for a status entry. Renames report where the file went,
/// not where it came from.
fn status_path(entry: &git2::StatusEntry<'_>) -> String {
    let status = entry.status();
    let delta = if status.contains(Status::INDEX_RENAMED) {
        entry.head_to_index()
    } else if status.contains(Status::WT_RENAMED) {
        entry.index_to_workdir()
    } else {
        None
    };

    delta
        .and_then(|d| d.new_file().path().map(|p| p.to_string_lossy().into_owned()))
        .unwrap_or_else(|| String::from_utf8_lossy(entry.path_bytes()).into_owned())
}

fn commit_files(
    repo: &Repository,
    message: &str,
    files: &[PathBuf],
    author: &VcsAuthor,
) -> Result<String> {
    let workdir = repo.workdir().ok_or_else(|| {
        GdError::Git(git2::Error::from_str("cannot commit in a bare repository"))
    })?;

    let mut index = repo.index()?;
    for file in files {
        if workdir.join(file).exists() {
            trace!("Staging {}", file.display());
            index.add_path(file)?;
        } else {
            trace!("Staging removal of {}", file.display());
            index.remove_path(file)?;
        }
    }
    index.write()?;

    let tree = repo.find_tree(index.write_tree()?)?;
    let signature = Signature::now(&author.name, &author.email)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(_) => None,
    };
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
    Ok(oid.to_string())
}

fn fetch_options(authentication: Option<VcsAuthentication>) -> FetchOptions<'static> {
    let mut callbacks = RemoteCallbacks::new();

    if let Some(auth) = authentication {
        let mut attempts = 0u8;
        callbacks.credentials(move |_url, _username, _allowed| {
            // libgit2 keeps asking while the remote rejects us.
            attempts += 1;
            if attempts > 1 {
                return Err(git2::Error::from_str(
                    "authentication failed: credentials were rejected",
                ));
            }
            match &auth {
                VcsAuthentication::Basic { username, password } => {
                    Cred::userpass_plaintext(username, password)
                }
                VcsAuthentication::OAuth2Token { token } => {
                    Cred::userpass_plaintext(token, "x-oauth-basic")
                }
            }
        });
    }

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}

/// Maps a clone failure onto the error kinds the presentation layer shows.
pub fn classify_clone_error(err: git2::Error, target: &Path) -> GdError {
    let message = err.message().to_string();
    let lower = message.to_lowercase();

    if lower.contains("exists and is not an empty directory") {
        GdError::WorkspaceAlreadyExists {
            path: target.to_path_buf(),
        }
    } else if lower.contains("authentication") || lower.contains("401") {
        GdError::VcsAuthenticationFail { message }
    } else if lower.contains("connection")
        || lower.contains("404")
        || lower.contains("curl error")
        || lower.contains("failed to resolve address")
        || err.class() == ErrorClass::Net
    {
        GdError::VcsConnection { message }
    } else {
        GdError::Git(err)
    }
}

fn join_error(e: task::JoinError) -> GdError {
    GdError::Git(git2::Error::from_str(&format!("git task failed: {}", e)))
}
