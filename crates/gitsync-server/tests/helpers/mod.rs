//! Test helpers para gitsync-server.

#![allow(dead_code, unused_imports)]

pub mod client;
pub mod fakes;

use std::sync::Arc;

use gitsync_core::SyncEngine;
use gitsync_server::metrics::setup::detached_handle;
use gitsync_server::{AppState, create_router};

pub use client::{TestClient, TestResponse};
pub use fakes::{COMMIT_A, COMMIT_B, StaticRepository, SwitchableStore};

pub const HOOK_PATH: &str = "/hook";

/// A router wired to in-memory fakes.
pub struct TestApp {
    pub client: TestClient,
    pub store: Arc<SwitchableStore>,
    pub repo: Arc<StaticRepository>,
    pub engine: Arc<SyncEngine>,
}

/// Builds an app whose repository head holds `files` at [`COMMIT_A`].
pub fn app(files: &[(&str, &str)]) -> TestApp {
    app_with_hook(files, HOOK_PATH)
}

pub fn app_with_hook(files: &[(&str, &str)], hook_path: &str) -> TestApp {
    let store = Arc::new(SwitchableStore::new());
    let repo = Arc::new(StaticRepository::new(COMMIT_A, files));
    let engine = Arc::new(SyncEngine::new(repo.clone(), store.clone()));
    let state = AppState::new(engine.clone(), store.clone(), "master");

    TestApp {
        client: TestClient::new(create_router(state, hook_path, detached_handle())),
        store,
        repo,
        engine,
    }
}
