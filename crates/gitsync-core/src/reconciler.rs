//! Converges store contents to a tree snapshot.
//!
//! The reconciler holds no lock of its own. Callers must make sure only one
//! pass runs at a time; [`SyncEngine`](crate::SyncEngine) does that.

use std::sync::Arc;
use std::time::Instant;

use gitsync_git::{RepositoryClient, TreeSnapshot};
use gitsync_store::{StoreClient, StoreError};
use tracing::{debug, error, info, warn};

use crate::changeset::ChangeSet;
use crate::error::SyncError;
use crate::report::{KeyOp, SyncKind, SyncReport};

/// Returns the value stored for a file: its bytes without trailing ASCII
/// whitespace. Leading whitespace is kept.
pub fn stored_value(contents: &[u8]) -> &[u8] {
    contents.trim_ascii_end()
}

/// Drives store calls for full and incremental passes.
pub struct Reconciler {
    store: Arc<dyn StoreClient>,
    repository: Arc<dyn RepositoryClient>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn StoreClient>, repository: Arc<dyn RepositoryClient>) -> Self {
        Self { store, repository }
    }

    /// Upserts every file in `tree`. Never deletes.
    ///
    /// # Errors
    ///
    /// Only `SyncError::StoreUnavailable`; per-key failures land in the report.
    pub async fn full_sync(&self, tree: &TreeSnapshot) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        self.ensure_store().await?;

        let mut report = SyncReport::new(SyncKind::Full, tree.commit().as_str());
        let files: Vec<(&str, &[u8])> = tree.files().collect();

        debug!(commit = %tree.commit(), files = files.len(), "Starting full sync");

        for (path, contents) in files {
            self.upsert(path, contents, &mut report).await;
        }

        report.finish(started);
        Ok(report)
    }

    /// Applies `changes` against `tree`.
    ///
    /// Added and modified paths missing from `tree` are skipped. Removed
    /// paths are deleted unless the working copy still holds the file.
    ///
    /// # Errors
    ///
    /// Only `SyncError::StoreUnavailable`; per-key failures land in the report.
    pub async fn incremental_sync(
        &self,
        changes: &ChangeSet,
        tree: &TreeSnapshot,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        self.ensure_store().await?;

        let mut report = SyncReport::new(SyncKind::Incremental, tree.commit().as_str());

        debug!(
            commit = %tree.commit(),
            changes = changes.len(),
            "Starting incremental sync"
        );

        for path in changes.added().chain(changes.modified()) {
            match tree.file_bytes(path) {
                Ok(contents) => self.upsert(path, contents, &mut report).await,
                Err(_) => {
                    info!(path, commit = %tree.commit(), "Path not in tree, skipping");
                    report.skip(path);
                },
            }
        }

        for path in changes.removed() {
            self.remove(path, &mut report).await;
        }

        report.finish(started);
        Ok(report)
    }

    async fn ensure_store(&self) -> Result<(), SyncError> {
        self.store.ping().await.map_err(|e| {
            warn!(store = self.store.name(), error = %e, "Store unreachable");
            SyncError::StoreUnavailable(e)
        })
    }

    async fn upsert(&self, path: &str, contents: &[u8], report: &mut SyncReport) {
        let value = stored_value(contents);

        let exists = match self.store.exists(path).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(path, error = %e, "Couldn't check key");
                report.fail(path, e.to_string());
                return;
            },
        };

        let result = if exists {
            self.store.set(path, value).await.map(|()| KeyOp::Set)
        } else {
            match self.store.create(path, value).await {
                Ok(()) => Ok(KeyOp::Create),
                Err(StoreError::KeyExists(_)) => {
                    debug!(path, "Key appeared concurrently, overwriting");
                    self.store.set(path, value).await.map(|()| KeyOp::Set)
                },
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(op) => {
                debug!(path, op = op.as_str(), "Key synced");
                report.record(op, path);
            },
            Err(e) => {
                warn!(path, error = %e, "Couldn't sync key");
                report.fail(path, e.to_string());
            },
        }
    }

    async fn remove(&self, path: &str, report: &mut SyncReport) {
        match self.repository.working_copy_contains(path).await {
            Ok(false) => {},
            Ok(true) => {
                error!(path, "File still present in working copy, refusing to delete key");
                report.fail(path, "file still present in working copy");
                return;
            },
            Err(e) => {
                error!(path, error = %e, "Couldn't check working copy, refusing to delete key");
                report.fail(path, e.to_string());
                return;
            },
        }

        match self.store.delete(path).await {
            Ok(()) => {
                debug!(path, "Key deleted");
                report.record(KeyOp::Delete, path);
            },
            Err(StoreError::KeyNotFound(_)) => {
                debug!(path, "Key already absent");
                report.record(KeyOp::Delete, path);
            },
            Err(e) => {
                warn!(path, error = %e, "Couldn't delete key");
                report.fail(path, e.to_string());
            },
        }
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("store", &self.store.name())
            .field("repository", &self.repository.name())
            .finish()
    }
}
