//! Sync pass metrics recording.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::report::{KeyOp, SyncKind, SyncReport};

/// Registra las metricas de sincronizacion.
/// Llamar una vez al inicio, despues de instalar el recorder.
pub fn register_sync_metrics() {
    metrics::describe_counter!(
        "gitsync_sync_passes_total",
        "Total number of reconciliation passes by kind and outcome"
    );
    metrics::describe_counter!(
        "gitsync_sync_keys_total",
        "Total number of per-key store results by operation"
    );
    metrics::describe_histogram!(
        "gitsync_sync_duration_seconds",
        "Time spent in a reconciliation pass"
    );
}

/// Registra una pasada completada.
pub(crate) fn record_pass(report: &SyncReport) {
    let kind = report.kind().as_str();
    let outcome = if report.is_clean() { "ok" } else { "partial" };

    counter!("gitsync_sync_passes_total", "kind" => kind, "outcome" => outcome).increment(1);

    for (op, count) in [
        (KeyOp::Create, report.created().len()),
        (KeyOp::Set, report.updated().len()),
        (KeyOp::Delete, report.deleted().len()),
    ] {
        if count > 0 {
            counter!("gitsync_sync_keys_total", "op" => op.as_str()).increment(count as u64);
        }
    }

    for (op, count) in [
        ("skip", report.skipped().len()),
        ("fail", report.failed().len()),
    ] {
        if count > 0 {
            counter!("gitsync_sync_keys_total", "op" => op).increment(count as u64);
        }
    }

    histogram!("gitsync_sync_duration_seconds", "kind" => kind)
        .record(report.duration().as_secs_f64());
}

/// Registra una pasada abortada.
pub(crate) fn record_aborted(kind: SyncKind, elapsed: Duration) {
    counter!("gitsync_sync_passes_total", "kind" => kind.as_str(), "outcome" => "error")
        .increment(1);
    histogram!("gitsync_sync_duration_seconds", "kind" => kind.as_str())
        .record(elapsed.as_secs_f64());
}
