//! Outcome tracking across passes.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::Serialize;

use crate::report::SyncReport;

/// Tracks the last results of the engine for status reporting.
#[derive(Debug, Default)]
pub struct SyncState {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    commit: Option<String>,
    last_success: Option<SystemTime>,
    last_report: Option<SyncReport>,
    last_error: Option<String>,
    failure_count: u32,
}

/// Serializable copy of a [`SyncState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub commit: Option<String>,
    /// Seconds since the Unix epoch.
    pub last_success: Option<u64>,
    pub last_report: Option<SyncReport>,
    pub last_error: Option<String>,
    pub failure_count: u32,
    pub healthy: bool,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the commit of the last completed pass.
    pub fn commit(&self) -> Option<String> {
        self.inner.read().commit.clone()
    }

    /// Records a completed pass.
    pub fn record_success(&self, report: &SyncReport) {
        let mut inner = self.inner.write();
        inner.commit = Some(report.commit().to_string());
        inner.last_success = Some(SystemTime::now());
        inner.last_report = Some(report.clone());
        inner.last_error = None;
        inner.failure_count = 0;
    }

    /// Records a pass that aborted.
    pub fn record_failure(&self, error: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.last_error = Some(error.into());
        inner.failure_count += 1;
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.inner.read().last_error.clone()
    }

    /// Returns the number of consecutive aborted passes.
    pub fn failure_count(&self) -> u32 {
        self.inner.read().failure_count
    }

    /// Returns true once a pass has completed.
    pub fn is_initialized(&self) -> bool {
        self.inner.read().commit.is_some()
    }

    /// Returns true if a pass has completed and the latest one did not abort.
    pub fn is_healthy(&self) -> bool {
        let inner = self.inner.read();
        inner.commit.is_some() && inner.last_error.is_none()
    }

    pub fn snapshot(&self) -> SyncStatus {
        let inner = self.inner.read();
        SyncStatus {
            commit: inner.commit.clone(),
            last_success: inner
                .last_success
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs()),
            last_report: inner.last_report.clone(),
            last_error: inner.last_error.clone(),
            failure_count: inner.failure_count,
            healthy: inner.commit.is_some() && inner.last_error.is_none(),
        }
    }
}
