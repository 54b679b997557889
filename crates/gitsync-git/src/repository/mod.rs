//! Working copy management.
//!
//! This module provides cloning, pulling and snapshotting of the mirrored branch.

mod commit;
mod config;
mod git_ops;

pub use commit::CommitId;
pub use config::{RepoAuth, RepoConfig, RepoConfigBuilder};
pub use git_ops::{GitRepository, RepoState};
