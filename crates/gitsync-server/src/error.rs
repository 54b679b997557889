use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gitsync_core::{IngestError, SyncError};
use gitsync_store::StoreError;
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    /// Ya hay una sincronizacion en curso
    Conflict(String),

    /// El store no responde
    StoreUnavailable(String),

    /// Error interno
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::InProgress => AppError::Conflict(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", msg),
            AppError::StoreUnavailable(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Store Unavailable",
                msg,
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                msg,
            ),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
