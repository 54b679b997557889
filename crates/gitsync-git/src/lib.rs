//! # gitsync Git client
//!
//! Local working copy of the branch that gitsync mirrors into the key-value
//! store.
//!
//! This crate provides the repository side of the sync engine: it clones the
//! branch, keeps the working copy up to date with the remote, and produces
//! immutable [`TreeSnapshot`]s of committed trees.
//!
//! ## Features
//!
//! - Git operations via gix, no system `git` required
//! - SSH key or HTTP basic authentication
//! - Bounded clone and fetch with interruptible blocking tasks
//! - Async [`RepositoryClient`] trait so the engine can be tested with fakes
//!
//! ## Example
//!
//! ```ignore
//! use gitsync_git::{GitRepository, RepoConfig, RepositoryClient};
//!
//! let config = RepoConfig::builder()
//!     .url("https://github.com/org/config-repo.git")
//!     .local_path("/var/lib/gitsync/repo")
//!     .branch("main")
//!     .build()?;
//!
//! let repo = GitRepository::open_or_clone(config).await?;
//! repo.pull().await?;
//! let tree = repo.head_tree().await?;
//! ```

pub mod client;
pub mod error;
pub mod repository;
pub mod snapshot;

// Re-exports
pub use client::{PullOutcome, RepositoryClient};
pub use error::RepoError;
pub use repository::{CommitId, GitRepository, RepoAuth, RepoConfig, RepoState};
pub use snapshot::{TreeSnapshot, validate_repo_path};
