//! # gitsync server
//!
//! HTTP surface and process wiring for gitsync: webhook ingestion,
//! on-demand sync, store status, health and Prometheus metrics.

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod settings;
pub mod state;

// Re-exports
pub use error::AppError;
pub use handlers::health::HealthResponse;
pub use server::{create_router, serve, shutdown_signal};
pub use settings::{Settings, SettingsError};
pub use state::AppState;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
