//! Store reachability and last sync outcome.

use axum::{Json, extract::State};
use gitsync_core::SyncStatus;
use serde::Serialize;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub store: String,
    pub syncing: bool,
    pub sync: SyncStatus,
}

/// Handler para `GET /status`.
///
/// Answers 500 when the store does not respond to a ping.
pub async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    if let Err(e) = state.store().ping().await {
        warn!(error = %e, "Store unreachable");
        return Err(e.into());
    }

    Ok(Json(StatusResponse {
        store: state.store().name().to_string(),
        syncing: state.engine().is_running(),
        sync: state.engine().state().snapshot(),
    }))
}
