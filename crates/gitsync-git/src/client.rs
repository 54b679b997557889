//! Repository client trait definition.

use async_trait::async_trait;

use crate::error::RepoError;
use crate::repository::CommitId;
use crate::snapshot::TreeSnapshot;

/// Result of bringing the working copy up to date with the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The local branch already pointed at the remote tip.
    UpToDate { head: CommitId },
    /// The local branch moved.
    Updated { from: CommitId, to: CommitId },
}

impl PullOutcome {
    /// Returns true if the working copy changed.
    pub fn changed(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }

    /// The local head after the pull.
    pub fn head(&self) -> &CommitId {
        match self {
            Self::UpToDate { head } => head,
            Self::Updated { to, .. } => to,
        }
    }
}

/// Access to a local working copy of one branch.
///
/// Implementations own a single on-disk checkout. Callers must not run two
/// `pull` calls against the same working copy concurrently; the sync engine
/// serializes every pass.
///
/// # Implementors
///
/// - `GitRepository` - gix-backed working copy
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Fetches from the remote and fast-forwards the working copy.
    ///
    /// An already up to date working copy is not an error.
    async fn pull(&self) -> Result<PullOutcome, RepoError>;

    /// Returns a snapshot of the current local HEAD.
    async fn head_tree(&self) -> Result<TreeSnapshot, RepoError>;

    /// Returns a snapshot of the tree at `commit`.
    ///
    /// # Errors
    ///
    /// - `RepoError::CommitNotFound` if the commit is not in the local object database
    async fn resolve_tree(&self, commit: &CommitId) -> Result<TreeSnapshot, RepoError>;

    /// Returns true if `path` exists as a file in the on-disk working copy.
    async fn working_copy_contains(&self, path: &str) -> Result<bool, RepoError>;

    /// Returns the name of this client, for logging.
    fn name(&self) -> &str {
        "git"
    }
}
