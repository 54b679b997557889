//! On-demand full sync.

use axum::{Json, extract::State};
use gitsync_core::{SyncReport, Trigger};

use crate::error::AppError;
use crate::state::AppState;

/// Handler para `POST /sync`.
///
/// Runs a full sync and returns its report. Answers 409 instead of waiting
/// when a pass is already running.
pub async fn sync_handler(State(state): State<AppState>) -> Result<Json<SyncReport>, AppError> {
    let report = state.engine().try_full_sync(Trigger::Manual).await?;
    Ok(Json(report))
}
