//! Async wrappers over the primitive file operations used by the note store
//! and the workspace coordinator.
//!
//! Nothing here caches: every call reflects what is on disk right now. All
//! failures come back as [`GdError::StorageFailure`] carrying the offending
//! path, so callers can decide whether "not found" means empty or fatal.
use std::{
    io::{self, Write},
    path::Path,
};

use log::{debug, error, trace};
use tempfile::NamedTempFile;
use tokio::{fs, task};
use walkdir::WalkDir;

use crate::{GdError, Result};

fn storage_failure(path: &Path, source: io::Error) -> GdError {
    GdError::StorageFailure {
        path: path.to_path_buf(),
        source,
    }
}

fn join_failure(path: &Path, e: task::JoinError) -> GdError {
    storage_failure(path, io::Error::other(e))
}

/// Returns whether anything exists at `path`.
pub async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Returns whether `path` exists and is a directory.
pub async fn is_directory(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Reads the whole file as raw bytes.
pub async fn read_file(path: &Path) -> Result<Vec<u8>> {
    trace!("Reading file: {}", path.display());
    fs::read(path).await.map_err(|e| storage_failure(path, e))
}

/// Reads the whole file as UTF-8 text.
pub async fn read_to_string(path: &Path) -> Result<String> {
    trace!("Reading text file: {}", path.display());
    fs::read_to_string(path)
        .await
        .map_err(|e| storage_failure(path, e))
}

/// Writes `value` to `path`, replacing any existing file atomically.
///
/// The bytes go to a temporary file in the same directory first, which is
/// then persisted over the destination, so readers never observe a half
/// written file.
pub async fn write_file(path: &Path, value: impl AsRef<[u8]>) -> Result<()> {
    let target = path.to_path_buf();
    let bytes = value.as_ref().to_vec();

    task::spawn_blocking(move || write_atomic(&target, &bytes))
        .await
        .map_err(|e| join_failure(path, e))?
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    debug!("Creating temporary file in directory: {}", dir.display());
    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
        error!("Failed to create temporary file in {}: {}", dir.display(), e);
        storage_failure(path, e)
    })?;

    temp_file
        .write_all(bytes)
        .and_then(|_| temp_file.flush())
        .map_err(|e| {
            error!("Failed to write temporary file for {}: {}", path.display(), e);
            storage_failure(path, e)
        })?;

    temp_file.persist(path).map_err(|e| {
        error!("Failed to persist file {}: {}", path.display(), e.error);
        storage_failure(path, e.error)
    })?;

    trace!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Lists the names of the direct children of `path`.
pub async fn list_directory(path: &Path) -> Result<Vec<String>> {
    let dir = path.to_path_buf();

    task::spawn_blocking(move || {
        let mut names = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("directory walk failed"));
                storage_failure(&dir, source)
            })?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    })
    .await
    .map_err(|e| join_failure(path, e))?
}

/// Creates a single directory; fails if the parent is missing or the
/// directory already exists.
pub async fn make_directory(path: &Path) -> Result<()> {
    debug!("Creating directory: {}", path.display());
    fs::create_dir(path)
        .await
        .map_err(|e| storage_failure(path, e))
}

/// Makes sure `path` exists as a directory, creating missing parents.
/// Calling it on an existing directory is a no-op; an existing non-directory
/// is an error.
pub async fn ensure_directory(path: &Path) -> Result<()> {
    if let Ok(metadata) = fs::metadata(path).await {
        if metadata.is_dir() {
            trace!("Directory already exists: {}", path.display());
            return Ok(());
        }
        error!("Path exists but is not a directory: {}", path.display());
        return Err(storage_failure(
            path,
            io::Error::new(io::ErrorKind::AlreadyExists, "not a directory"),
        ));
    }

    debug!("Directory does not exist, creating: {}", path.display());
    fs::create_dir_all(path).await.map_err(|e| {
        error!("Failed to create directory {}: {}", path.display(), e);
        storage_failure(path, e)
    })
}

/// Renames `from` to `to` within the same filesystem.
pub async fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to)
        .await
        .map_err(|e| storage_failure(from, e))
}

/// Removes a directory and everything under it.
pub async fn remove_directory(path: &Path) -> Result<()> {
    debug!("Removing directory: {}", path.display());
    fs::remove_dir_all(path)
        .await
        .map_err(|e| storage_failure(path, e))
}
