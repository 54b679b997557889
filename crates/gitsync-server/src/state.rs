//! Application state.

use std::sync::Arc;

use gitsync_core::{SyncEngine, WebhookIngestor};
use gitsync_store::StoreClient;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<SyncEngine>,
    ingestor: Arc<WebhookIngestor>,
    store: Arc<dyn StoreClient>,
}

impl AppState {
    /// Creates the state for an engine mirroring `branch`.
    ///
    /// `store` must be the same client the engine writes to; `/status`
    /// pings it.
    pub fn new(engine: Arc<SyncEngine>, store: Arc<dyn StoreClient>, branch: &str) -> Self {
        Self {
            ingestor: Arc::new(WebhookIngestor::new(Arc::clone(&engine), branch)),
            engine,
            store,
        }
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn ingestor(&self) -> &WebhookIngestor {
        &self.ingestor
    }

    pub fn store(&self) -> &dyn StoreClient {
        self.store.as_ref()
    }
}
