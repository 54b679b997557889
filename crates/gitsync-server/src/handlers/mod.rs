//! HTTP handlers.

pub mod health;
pub mod hook;
pub mod metrics;
pub mod status;
pub mod sync;
