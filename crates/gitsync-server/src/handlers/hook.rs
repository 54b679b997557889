//! Webhook endpoint.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use gitsync_core::{EVENT_HEADER, HookEvent, IngestOutcome, SyncReport};
use serde::Serialize;
use tracing::error;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SyncReport>,
}

impl From<IngestOutcome> for HookResponse {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Pong => Self {
                status: "pong",
                reason: None,
                report: None,
            },
            IngestOutcome::Ignored { reason } => Self {
                status: "ignored",
                reason: Some(reason),
                report: None,
            },
            IngestOutcome::Synced(report) => Self {
                status: "synced",
                reason: None,
                report: Some(report),
            },
        }
    }
}

/// Handler para el webhook de push.
///
/// The event kind comes from the `X-GitHub-Event` header.
pub async fn hook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<HookResponse>, AppError> {
    let event = HookEvent::from_header(
        headers
            .get(EVENT_HEADER)
            .and_then(|v| v.to_str().ok()),
    );

    match state.ingestor().ingest(event, &body).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(e) => {
            error!(error = %e, "Webhook ingestion failed");
            Err(e.into())
        },
    }
}
