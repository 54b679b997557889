use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "UP".to_string(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Liveness only; says nothing about the store or the last sync.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}
