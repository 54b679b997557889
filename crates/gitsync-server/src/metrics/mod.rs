//! Metrics module for the gitsync server.

pub mod http;
pub mod setup;

pub use setup::init_metrics;
