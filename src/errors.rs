//! Error types for the gdnotes workspace layer.
//!
//! This module defines custom error types that categorize the failures that
//! can occur while reading and writing notes or talking to the git backend.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Stable code for a clone rejected because of bad or missing credentials.
pub const AUTHENTICATION_FAIL: &str = "AUTHENTICATION_FAIL";
/// Stable code for a clone that could not reach the remote.
pub const CONNECTION_ERROR: &str = "CONNECTION_ERROR";
/// Stable code for setup against a path that already holds a workspace.
pub const WORKSPACE_ALREADY_EXISTS: &str = "WORKSPACE_ALREADY_EXISTS";

/// The main error type for the gdnotes library.
#[derive(Error, Debug)]
pub enum GdError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unclassified error reported by the git backend.
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// A storage operation failed on a specific path.
    #[error("Storage failure at {path}: {source}")]
    StorageFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// A note directory with the same name already exists.
    #[error("Note already exists: {path}")]
    NoteAlreadyExists { path: PathBuf },

    /// Invalid note format or content.
    #[error("Invalid note format: {message}")]
    InvalidFormat { message: String },

    /// Attempt to persist a note body without any snippet.
    #[error("Note content for {note_id} has no snippets")]
    EmptyContent { note_id: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// The remote rejected the supplied credentials.
    #[error("Authentication failed: {message}")]
    VcsAuthenticationFail { message: String },

    /// The remote could not be reached or does not exist.
    #[error("Connection error: {message}")]
    VcsConnection { message: String },

    /// Setup was attempted on a path that already holds a repository.
    #[error("Workspace already exists and is not an empty directory")]
    WorkspaceAlreadyExists { path: PathBuf },

    /// A repository operation was requested before setup completed.
    #[error("Workspace is not ready: {path}")]
    WorkspaceNotReady { path: PathBuf },

    /// A version control failure relayed across the worker boundary.
    #[error("Version control error: {message}")]
    VcsFailure { message: String },

    /// The background git worker is stopped or has gone away.
    #[error("{message}")]
    WorkerUnavailable { message: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl GdError {
    /// Returns the stable error code consumed by the presentation layer, if
    /// this error belongs to a classified kind.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            GdError::VcsAuthenticationFail { .. } => Some(AUTHENTICATION_FAIL),
            GdError::VcsConnection { .. } => Some(CONNECTION_ERROR),
            GdError::WorkspaceAlreadyExists { .. } => Some(WORKSPACE_ALREADY_EXISTS),
            _ => None,
        }
    }

    /// True when the underlying cause is a missing file or directory.
    pub fn is_not_found(&self) -> bool {
        match self {
            GdError::Io(e) | GdError::StorageFailure { source: e, .. } => {
                e.kind() == io::ErrorKind::NotFound
            }
            GdError::NoteNotFound { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classified_errors_expose_codes() {
        let auth = GdError::VcsAuthenticationFail {
            message: "bad".to_string(),
        };
        let conn = GdError::VcsConnection {
            message: "down".to_string(),
        };
        assert_eq!(auth.code(), Some(AUTHENTICATION_FAIL));
        assert_eq!(conn.code(), Some(CONNECTION_ERROR));
        assert_eq!(
            GdError::Git(git2::Error::from_str("boom")).code(),
            None
        );
    }

    #[test]
    fn workspace_exists_message_is_user_facing() {
        let e = GdError::WorkspaceAlreadyExists {
            path: PathBuf::from("/tmp/ws"),
        };
        assert_eq!(
            e.to_string(),
            "Workspace already exists and is not an empty directory"
        );
        assert_eq!(e.code(), Some(WORKSPACE_ALREADY_EXISTS));
    }

    #[test]
    fn not_found_detection() {
        let e = GdError::StorageFailure {
            path: PathBuf::from("x"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert!(e.is_not_found());
        let e = GdError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert!(!e.is_not_found());
    }
}
