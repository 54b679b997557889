//! The single serialization point for reconciliation passes.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use gitsync_git::{CommitId, RepositoryClient};
use gitsync_store::StoreClient;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::changeset::ChangeSet;
use crate::error::SyncError;
use crate::metrics;
use crate::reconciler::Reconciler;
use crate::report::{SyncKind, SyncReport};
use crate::state::SyncState;

/// What started a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Periodic,
    Manual,
    Webhook,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Periodic => "periodic",
            Self::Manual => "manual",
            Self::Webhook => "webhook",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs reconciliation passes one at a time.
///
/// Every trigger (timer, on-demand request, webhook) goes through the same
/// gate, so at most one pass touches the working copy and the store at any
/// moment. Full syncs refuse to wait for a running pass; webhook pushes
/// queue behind it.
///
/// A pass runs on its own task that owns the gate. Dropping the caller's
/// future (an HTTP client hanging up) does not cancel the pass; it runs to
/// completion and still records its outcome.
pub struct SyncEngine {
    inner: Arc<EngineInner>,
    gate: Arc<Mutex<()>>,
}

struct EngineInner {
    repository: Arc<dyn RepositoryClient>,
    reconciler: Reconciler,
    closed: AtomicBool,
    state: SyncState,
}

impl SyncEngine {
    pub fn new(repository: Arc<dyn RepositoryClient>, store: Arc<dyn StoreClient>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                reconciler: Reconciler::new(store, Arc::clone(&repository)),
                repository,
                closed: AtomicBool::new(false),
                state: SyncState::new(),
            }),
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Pulls and reconciles the whole head tree.
    ///
    /// # Errors
    ///
    /// - `SyncError::InProgress` if a pass is already running
    /// - `SyncError::ShuttingDown` after [`shutdown`](Self::shutdown)
    /// - any pull, tree or store connectivity failure
    pub async fn try_full_sync(&self, trigger: Trigger) -> Result<SyncReport, SyncError> {
        self.ensure_open()?;
        let guard = Arc::clone(&self.gate).try_lock_owned().map_err(|_| {
            debug!(%trigger, "Sync already in progress");
            SyncError::InProgress
        })?;

        let inner = Arc::clone(&self.inner);
        run_detached(async move {
            let _guard = guard;
            info!(%trigger, "Starting full sync");
            let started = Instant::now();
            let result = inner.full_pass().await;
            inner.finish(SyncKind::Full, trigger, started, result)
        })
        .await
    }

    /// Pulls, resolves `after` and applies `changes` against that tree.
    ///
    /// Waits for a running pass instead of refusing. The store is not touched
    /// if the pull or the tree resolution fails.
    pub async fn apply_push(
        &self,
        changes: &ChangeSet,
        after: &CommitId,
    ) -> Result<SyncReport, SyncError> {
        self.ensure_open()?;
        let guard = Arc::clone(&self.gate).lock_owned().await;
        self.ensure_open()?;

        let inner = Arc::clone(&self.inner);
        let changes = changes.clone();
        let after = after.clone();
        run_detached(async move {
            let _guard = guard;
            info!(commit = %after, changes = changes.len(), "Applying push");
            let started = Instant::now();
            let result = inner.push_pass(&changes, &after).await;
            inner.finish(SyncKind::Incremental, Trigger::Webhook, started, result)
        })
        .await
    }

    /// Stops accepting triggers and waits for the in-flight pass.
    pub async fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        let _guard = self.gate.lock().await;
        info!("Sync engine drained");
    }

    /// Returns true while a pass holds the gate.
    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> &SyncState {
        &self.inner.state
    }

    fn ensure_open(&self) -> Result<(), SyncError> {
        if self.is_closed() {
            Err(SyncError::ShuttingDown)
        } else {
            Ok(())
        }
    }
}

/// Spawns a pass and waits for it.
async fn run_detached<F>(pass: F) -> Result<SyncReport, SyncError>
where
    F: Future<Output = Result<SyncReport, SyncError>> + Send + 'static,
{
    match tokio::spawn(pass).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(SyncError::Detached(e.to_string())),
    }
}

impl EngineInner {
    async fn full_pass(&self) -> Result<SyncReport, SyncError> {
        let pulled = self.repository.pull().await.map_err(SyncError::Pull)?;
        debug!(head = %pulled.head(), changed = pulled.changed(), "Working copy updated");

        let tree = self.repository.head_tree().await.map_err(SyncError::Tree)?;
        self.reconciler.full_sync(&tree).await
    }

    async fn push_pass(
        &self,
        changes: &ChangeSet,
        after: &CommitId,
    ) -> Result<SyncReport, SyncError> {
        let pulled = self.repository.pull().await.map_err(SyncError::Pull)?;
        debug!(head = %pulled.head(), changed = pulled.changed(), "Working copy updated");

        let tree = self
            .repository
            .resolve_tree(after)
            .await
            .map_err(SyncError::Tree)?;
        self.reconciler.incremental_sync(changes, &tree).await
    }

    fn finish(
        &self,
        kind: SyncKind,
        trigger: Trigger,
        started: Instant,
        result: Result<SyncReport, SyncError>,
    ) -> Result<SyncReport, SyncError> {
        match &result {
            Ok(report) => {
                self.state.record_success(report);
                metrics::record_pass(report);
                info!(
                    kind = kind.as_str(),
                    %trigger,
                    commit = report.commit(),
                    created = report.created().len(),
                    updated = report.updated().len(),
                    deleted = report.deleted().len(),
                    skipped = report.skipped().len(),
                    failed = report.failed().len(),
                    "Repo synced"
                );
            },
            Err(e) => {
                self.state.record_failure(e.to_string());
                metrics::record_aborted(kind, started.elapsed());
                warn!(kind = kind.as_str(), %trigger, error = %e, "Sync pass aborted");
            },
        }
        result
    }
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("reconciler", &self.inner.reconciler)
            .field("closed", &self.is_closed())
            .field("running", &self.is_running())
            .field("state", &self.inner.state)
            .finish()
    }
}
