//! Error types for store clients.

/// Errors returned by a [`StoreClient`](crate::StoreClient).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `create` was called for a key that already exists.
    #[error("key already exists: {0}")]
    KeyExists(String),

    /// `delete` was called for a key that does not exist.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// No endpoint could be reached.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// The store answered with a non-success status.
    #[error("store rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The store answered with a body we could not understand.
    #[error("unexpected store response: {0}")]
    Protocol(String),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Creates a new unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns true if the store could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
