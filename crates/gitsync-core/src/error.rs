//! Error types for the synchronization engine.

use gitsync_git::RepoError;
use gitsync_store::StoreError;
use thiserror::Error;

/// Errors that abort a whole reconciliation pass.
///
/// Per-key store failures never show up here; they are recorded in the
/// pass's `SyncReport` instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Another pass holds the engine.
    #[error("sync already in progress")]
    InProgress,

    /// The engine no longer accepts triggers.
    #[error("sync engine is shutting down")]
    ShuttingDown,

    /// The store did not answer the pre-pass ping.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// Bringing the working copy up to date failed.
    #[error("failed to update working copy: {0}")]
    Pull(#[source] RepoError),

    /// The tree to reconcile against could not be read.
    #[error("failed to read tree: {0}")]
    Tree(#[source] RepoError),

    /// The task running the pass was cancelled by the runtime.
    #[error("sync task did not complete: {0}")]
    Detached(String),
}

impl SyncError {
    /// Returns true if the pass was refused rather than attempted.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::InProgress | Self::ShuttingDown)
    }
}

/// Errors from turning a push notification into a pass.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed push notification: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid target commit '{0}'")]
    InvalidCommit(String),

    /// The push deleted the mirrored branch.
    #[error("push deletes branch '{0}'")]
    BranchDeleted(String),

    #[error(transparent)]
    Sync(#[from] SyncError),
}
