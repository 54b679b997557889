//! Error types for the repository client.

use std::path::PathBuf;

/// Errors that can occur when working with the local repository.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The requested commit is not present in the local object database.
    #[error("commit not found: {0}")]
    CommitNotFound(String),

    /// The requested file is not part of the tree snapshot.
    #[error("file not found in tree {commit}: {path}")]
    FileNotFound { commit: String, path: String },

    /// A repository path escapes the working copy or is otherwise unusable.
    #[error("invalid repository path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// The repository is not available (not cloned, or cloning failed).
    #[error("repository unavailable: {reason}")]
    Unavailable { reason: String },

    /// An I/O error occurred on the working copy.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A Git operation failed.
    #[error("git error: {0}")]
    Git(String),

    /// A timeout occurred while waiting for a network operation.
    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Another pull is already running against this working copy.
    #[error("working copy is being updated, try again later")]
    Busy,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RepoError {
    /// Creates a new Git error.
    pub fn git(msg: impl Into<String>) -> Self {
        Self::Git(msg.into())
    }

    /// Creates a new unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Timeout { .. } | Self::Busy
        )
    }
}
