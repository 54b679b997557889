//! Outcome of a reconciliation pass.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Which entry point produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    Full,
    Incremental,
}

impl SyncKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }
}

/// Store operation applied to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyOp {
    Create,
    Set,
    Delete,
}

impl KeyOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Set => "set",
            Self::Delete => "delete",
        }
    }
}

/// A path the pass could not converge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyFailure {
    pub path: String,
    pub reason: String,
}

/// Per-path results of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    kind: SyncKind,
    commit: String,
    created: Vec<String>,
    updated: Vec<String>,
    deleted: Vec<String>,
    skipped: Vec<String>,
    failed: Vec<KeyFailure>,
    #[serde(rename = "durationMs", serialize_with = "as_millis")]
    duration: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl SyncReport {
    /// Starts an empty report for a pass over `commit`.
    pub fn new(kind: SyncKind, commit: impl Into<String>) -> Self {
        Self {
            kind,
            commit: commit.into(),
            created: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Records a successful store operation.
    pub fn record(&mut self, op: KeyOp, path: &str) {
        let bucket = match op {
            KeyOp::Create => &mut self.created,
            KeyOp::Set => &mut self.updated,
            KeyOp::Delete => &mut self.deleted,
        };
        bucket.push(path.to_string());
    }

    /// Records a path that was intentionally left alone.
    pub fn skip(&mut self, path: &str) {
        self.skipped.push(path.to_string());
    }

    /// Records a path whose store operation failed.
    pub fn fail(&mut self, path: &str, reason: impl Into<String>) {
        self.failed.push(KeyFailure {
            path: path.to_string(),
            reason: reason.into(),
        });
    }

    /// Stamps the elapsed time since `started`.
    pub fn finish(&mut self, started: Instant) {
        self.duration = started.elapsed();
    }

    pub fn kind(&self) -> SyncKind {
        self.kind
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn created(&self) -> &[String] {
        &self.created
    }

    pub fn updated(&self) -> &[String] {
        &self.updated
    }

    pub fn deleted(&self) -> &[String] {
        &self.deleted
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn failed(&self) -> &[KeyFailure] {
        &self.failed
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Paths that reached the store successfully.
    pub fn succeeded(&self) -> impl Iterator<Item = &str> + '_ {
        self.created
            .iter()
            .chain(&self.updated)
            .chain(&self.deleted)
            .map(String::as_str)
    }

    /// Returns true if the failure list is empty.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns true if `path` is recorded as failed.
    pub fn is_failed(&self, path: &str) -> bool {
        self.failed.iter().any(|f| f.path == path)
    }
}
