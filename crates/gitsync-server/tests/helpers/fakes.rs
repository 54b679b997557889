//! In-memory collaborators.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use gitsync_git::{CommitId, PullOutcome, RepoError, RepositoryClient, TreeSnapshot};
use gitsync_store::{MemoryStore, StoreClient, StoreError};
use tokio::sync::Notify;

pub const COMMIT_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const COMMIT_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

fn snapshot(sha: &str, files: &[(&str, &str)]) -> TreeSnapshot {
    TreeSnapshot::from_files(
        CommitId::parse(sha).unwrap(),
        files.iter().map(|(p, c)| (*p, *c)),
    )
}

/// Memory store that can be switched off.
#[derive(Default)]
pub struct SwitchableStore {
    inner: MemoryStore,
    down: AtomicBool,
}

impl SwitchableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.inner
            .get(key)
            .map(|v| String::from_utf8_lossy(&v).into_owned())
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::unavailable("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StoreClient for SwitchableStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.exists(key).await
    }

    async fn create(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check()?;
        self.inner.create(key, value).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Repository whose trees are registered up front. `pull` never moves the
/// head; with the gate armed it parks until `release` is notified.
pub struct StaticRepository {
    head: CommitId,
    trees: Mutex<HashMap<CommitId, TreeSnapshot>>,
    gated: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl StaticRepository {
    pub fn new(head: &str, files: &[(&str, &str)]) -> Self {
        let tree = snapshot(head, files);
        let head = tree.commit().clone();
        Self {
            trees: Mutex::new(HashMap::from([(head.clone(), tree)])),
            head,
            gated: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Registers a tree that pushes can name.
    pub fn add_tree(&self, sha: &str, files: &[(&str, &str)]) {
        let tree = snapshot(sha, files);
        self.trees
            .lock()
            .unwrap()
            .insert(tree.commit().clone(), tree);
    }

    pub fn arm_gate(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RepositoryClient for StaticRepository {
    async fn pull(&self) -> Result<PullOutcome, RepoError> {
        if self.gated.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(PullOutcome::UpToDate {
            head: self.head.clone(),
        })
    }

    async fn head_tree(&self) -> Result<TreeSnapshot, RepoError> {
        self.resolve_tree(&self.head).await
    }

    async fn resolve_tree(&self, commit: &CommitId) -> Result<TreeSnapshot, RepoError> {
        self.trees
            .lock()
            .unwrap()
            .get(commit)
            .cloned()
            .ok_or_else(|| RepoError::CommitNotFound(commit.to_string()))
    }

    async fn working_copy_contains(&self, _path: &str) -> Result<bool, RepoError> {
        Ok(false)
    }
}
