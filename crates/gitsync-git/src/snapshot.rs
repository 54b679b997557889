//! Point-in-time views of a committed tree.

use std::collections::BTreeMap;
use std::path::{Component, Path};
use std::sync::Arc;

use crate::error::RepoError;
use crate::repository::CommitId;

/// An immutable view of every file path and its contents at one commit.
///
/// Cloning is cheap; the file map is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSnapshot {
    commit: CommitId,
    files: Arc<BTreeMap<String, Vec<u8>>>,
}

impl TreeSnapshot {
    /// Creates a snapshot from a commit id and its files.
    pub fn new(commit: CommitId, files: BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            commit,
            files: Arc::new(files),
        }
    }

    /// Creates a snapshot from `(path, contents)` pairs.
    pub fn from_files<P, C>(commit: CommitId, files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<String>,
        C: Into<Vec<u8>>,
    {
        Self::new(
            commit,
            files
                .into_iter()
                .map(|(p, c)| (p.into(), c.into()))
                .collect(),
        )
    }

    /// The commit this snapshot was taken at.
    pub fn commit(&self) -> &CommitId {
        &self.commit
    }

    /// Iterates over all file paths in path order.
    pub fn paths(&self) -> impl Iterator<Item = &str> + '_ {
        self.files.keys().map(String::as_str)
    }

    /// Iterates over `(path, contents)` pairs in path order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_slice()))
    }

    /// Returns true if the snapshot contains a file at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Returns the contents of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::FileNotFound` if no file exists at `path`.
    pub fn file_bytes(&self, path: &str) -> Result<&[u8], RepoError> {
        self.files
            .get(path)
            .map(Vec::as_slice)
            .ok_or_else(|| RepoError::FileNotFound {
                commit: self.commit.as_str().to_string(),
                path: path.to_string(),
            })
    }

    /// Number of files in the snapshot.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if the tree has no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Checks that a repository-relative path stays inside the working copy.
///
/// # Errors
///
/// Returns `RepoError::InvalidPath` for empty or absolute paths and for paths
/// with `..` components.
pub fn validate_repo_path(path: &str) -> Result<&Path, RepoError> {
    let invalid = |reason| RepoError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    if path.is_empty() {
        return Err(invalid("path is empty"));
    }

    let p = Path::new(path);
    for component in p.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {},
            Component::ParentDir => return Err(invalid("path contains '..'")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("path must be relative"));
            },
        }
    }

    Ok(p)
}
