//! Push notification ingestion.
//!
//! Turns one GitHub-style webhook delivery into at most one incremental pass.

use std::sync::Arc;

use gitsync_git::CommitId;
use serde::Deserialize;
use tracing::{debug, info};

use crate::changeset::{ChangeKind, ChangeSet};
use crate::engine::SyncEngine;
use crate::error::IngestError;
use crate::report::SyncReport;

/// Header carrying the event kind.
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Kind of a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    Ping,
    Push,
    Other(String),
}

impl HookEvent {
    /// Classifies the value of [`EVENT_HEADER`]. A missing header is `Other`.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("ping") => Self::Ping,
            Some(v) if v.eq_ignore_ascii_case("push") => Self::Push,
            Some(v) => Self::Other(v.to_string()),
            None => Self::Other(String::new()),
        }
    }
}

/// The parts of a push payload the engine needs.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,
    pub after: String,
    pub repository: PushRepository,
    #[serde(default)]
    pub commits: Vec<PushCommit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushRepository {
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushCommit {
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
}

impl PushEvent {
    pub fn parse(body: &[u8]) -> Result<Self, IngestError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Unions the per-commit path lists of every commit.
    pub fn change_set(&self) -> ChangeSet {
        self.commits
            .iter()
            .flat_map(|c| {
                let added = c.added.iter().map(|p| (ChangeKind::Added, p.as_str()));
                let modified = c.modified.iter().map(|p| (ChangeKind::Modified, p.as_str()));
                let removed = c.removed.iter().map(|p| (ChangeKind::Removed, p.as_str()));
                added.chain(modified).chain(removed)
            })
            .collect()
    }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A `ping` delivery.
    Pong,
    /// A delivery that was acknowledged without syncing.
    Ignored { reason: String },
    /// A push that ran an incremental pass.
    Synced(SyncReport),
}

/// Feeds push notifications into a [`SyncEngine`].
#[derive(Debug)]
pub struct WebhookIngestor {
    engine: Arc<SyncEngine>,
    branch_ref: String,
}

impl WebhookIngestor {
    /// Creates an ingestor for pushes to `branch`.
    pub fn new(engine: Arc<SyncEngine>, branch: &str) -> Self {
        Self {
            engine,
            branch_ref: format!("refs/heads/{}", branch),
        }
    }

    /// Handles one delivery.
    ///
    /// # Errors
    ///
    /// Any error means the store was left as it was before the delivery:
    /// a malformed body, an unusable `after` commit, or a failed pull or
    /// tree resolution.
    pub async fn ingest(&self, event: HookEvent, body: &[u8]) -> Result<IngestOutcome, IngestError> {
        match event {
            HookEvent::Ping => {
                info!("Ping received");
                Ok(IngestOutcome::Pong)
            },
            HookEvent::Other(kind) => {
                debug!(event = %kind, "Ignoring webhook event");
                Ok(IngestOutcome::Ignored {
                    reason: format!("unhandled event '{}'", kind),
                })
            },
            HookEvent::Push => self.ingest_push(body).await,
        }
    }

    async fn ingest_push(&self, body: &[u8]) -> Result<IngestOutcome, IngestError> {
        let event = PushEvent::parse(body)?;
        info!(
            repository = %event.repository.full_name,
            after = %event.after,
            "Push received"
        );

        if let Some(git_ref) = event.git_ref.as_deref()
            && git_ref != self.branch_ref
        {
            info!(git_ref, "Push to another branch, ignoring");
            return Ok(IngestOutcome::Ignored {
                reason: format!("push to {}", git_ref),
            });
        }

        let after = CommitId::parse(&event.after)
            .map_err(|_| IngestError::InvalidCommit(event.after.clone()))?;
        if after.is_null() {
            return Err(IngestError::BranchDeleted(self.branch_ref.clone()));
        }

        let changes = event.change_set();
        let report = self.engine.apply_push(&changes, &after).await?;
        Ok(IngestOutcome::Synced(report))
    }
}
