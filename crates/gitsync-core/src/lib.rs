//! # gitsync core
//!
//! Synchronization engine that mirrors a Git branch into a key-value store,
//! one key per file path.
//!
//! - [`Reconciler`] converges the store to a [`TreeSnapshot`](gitsync_git::TreeSnapshot)
//!   with per-key failure isolation
//! - [`SyncEngine`] serializes every pass behind a single gate
//! - [`SyncScheduler`] drives periodic full syncs
//! - [`WebhookIngestor`] turns push notifications into incremental syncs
//!
//! Repository and store access go through the
//! [`RepositoryClient`](gitsync_git::RepositoryClient) and
//! [`StoreClient`](gitsync_store::StoreClient) traits, injected at
//! construction.

pub mod changeset;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod reconciler;
pub mod report;
pub mod scheduler;
pub mod state;
pub mod webhook;

// Re-exports
pub use changeset::{ChangeKind, ChangeSet};
pub use engine::{SyncEngine, Trigger};
pub use error::{IngestError, SyncError};
pub use crate::metrics::register_sync_metrics;
pub use reconciler::{Reconciler, stored_value};
pub use report::{KeyFailure, KeyOp, SyncKind, SyncReport};
pub use scheduler::{SchedulerConfig, SchedulerHandle, SyncScheduler};
pub use state::{SyncState, SyncStatus};
pub use webhook::{EVENT_HEADER, HookEvent, IngestOutcome, PushEvent, WebhookIngestor};
