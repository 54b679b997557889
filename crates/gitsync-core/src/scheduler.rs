//! Periodic full-sync scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::engine::{SyncEngine, Trigger};
use crate::error::SyncError;

/// Configuration for the sync scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between passes. Zero disables the scheduler.
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
        }
    }
}

/// Handle for controlling a running scheduler.
///
/// Dropping the handle stops the loop.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signals the scheduler to stop after the current pass, if any.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Stops the scheduler and waits for its loop to exit.
    pub async fn join(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs a full sync on a fixed interval.
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    config: SchedulerConfig,
}

impl SyncScheduler {
    pub fn new(engine: Arc<SyncEngine>, config: SchedulerConfig) -> Self {
        Self { engine, config }
    }

    /// Starts the background loop.
    ///
    /// Returns `None` when the interval is zero. The first pass happens one
    /// interval after start.
    pub fn start(self) -> Option<SchedulerHandle> {
        if self.config.interval.is_zero() {
            info!("No sync cycle configured, periodic sync disabled");
            return None;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));

        Some(SchedulerHandle {
            shutdown_tx,
            task: Some(task),
        })
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let period = self.config.interval;
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Starting sync scheduler with interval {:?}", period);

        loop {
            tokio::select! {
                _ = timer.tick() => self.tick().await,
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        info!("Sync scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn tick(&self) {
        debug!("Starting scheduled sync");

        match self.engine.try_full_sync(Trigger::Periodic).await {
            Ok(report) => debug!(commit = report.commit(), "Scheduled sync finished"),
            Err(SyncError::InProgress) => debug!("Sync already running, waiting for next tick"),
            Err(SyncError::ShuttingDown) => debug!("Engine closed, skipping tick"),
            Err(e) => warn!(error = %e, "Couldn't sync automatically"),
        }
    }
}
