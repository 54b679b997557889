//! Fakes shared by the engine integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use gitsync_core::SyncEngine;
use gitsync_git::{CommitId, PullOutcome, RepoError, RepositoryClient, TreeSnapshot};
use gitsync_store::{MemoryStore, StoreClient, StoreError};
use parking_lot::Mutex;
use tokio::sync::Notify;

pub const COMMIT_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const COMMIT_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

pub fn commit(sha: &str) -> CommitId {
    CommitId::parse(sha).unwrap()
}

pub fn tree(sha: &str, files: &[(&str, &str)]) -> TreeSnapshot {
    TreeSnapshot::from_files(commit(sha), files.iter().map(|(p, c)| (*p, *c)))
}

/// A store call, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Exists(String),
    Create(String),
    Set(String),
    Delete(String),
}

impl Call {
    pub fn key(&self) -> &str {
        match self {
            Self::Exists(k) | Self::Create(k) | Self::Set(k) | Self::Delete(k) => k,
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Exists(_))
    }
}

/// Memory-backed store that logs every call and can be told to fail.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<String>>,
    unreachable: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        Self {
            inner: MemoryStore::with_entries(entries.iter().map(|(k, v)| (*k, *v))),
            ..Self::default()
        }
    }

    /// Makes every write to `key` fail.
    pub fn fail_key(&self, key: &str) {
        self.failing.lock().insert(key.to_string());
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    /// Writes that touched `key`.
    pub fn writes_for(&self, key: &str) -> Vec<Call> {
        self.writes().into_iter().filter(|c| c.key() == key).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.inner
            .get(key)
            .map(|v| String::from_utf8_lossy(&v).into_owned())
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    fn check(&self, key: &str) -> Result<(), StoreError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("connection refused"));
        }
        if self.failing.lock().contains(key) {
            return Err(StoreError::Rejected {
                status: 500,
                body: format!("injected failure for {}", key),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StoreClient for RecordingStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.calls.lock().push(Call::Exists(key.to_string()));
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("connection refused"));
        }
        self.inner.exists(key).await
    }

    async fn create(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.calls.lock().push(Call::Create(key.to_string()));
        self.check(key)?;
        self.inner.create(key, value).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.calls.lock().push(Call::Set(key.to_string()));
        self.check(key)?;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.calls.lock().push(Call::Delete(key.to_string()));
        self.check(key)?;
        self.inner.delete(key).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("connection refused"));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// In-memory repository client.
///
/// `pull` moves the head to the staged tree, if any. With the gate armed,
/// `pull` signals `entered` and then parks until `release` is notified.
#[derive(Default)]
pub struct FakeRepository {
    head: Mutex<Option<TreeSnapshot>>,
    staged: Mutex<Option<TreeSnapshot>>,
    trees: Mutex<HashMap<CommitId, TreeSnapshot>>,
    working_copy: Mutex<HashSet<String>>,
    fail_pull: AtomicBool,
    gated: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
    pulls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeRepository {
    pub fn new(head: TreeSnapshot) -> Self {
        let repo = Self::default();
        repo.trees.lock().insert(head.commit().clone(), head.clone());
        *repo.working_copy.lock() = head.paths().map(str::to_string).collect();
        *repo.head.lock() = Some(head);
        repo
    }

    /// Makes the next pulls move the head to `tree`.
    pub fn stage(&self, tree: TreeSnapshot) {
        self.trees.lock().insert(tree.commit().clone(), tree.clone());
        *self.staged.lock() = Some(tree);
    }

    /// Adds a file to the working copy without touching any tree.
    pub fn touch(&self, path: &str) {
        self.working_copy.lock().insert(path.to_string());
    }

    pub fn set_fail_pull(&self, fail: bool) {
        self.fail_pull.store(fail, Ordering::SeqCst);
    }

    pub fn arm_gate(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn disarm_gate(&self) {
        self.gated.store(false, Ordering::SeqCst);
    }

    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_pulls(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn advance(&self) -> Result<PullOutcome, RepoError> {
        let mut head = self.head.lock();
        let from = head
            .as_ref()
            .map(|t| t.commit().clone())
            .ok_or_else(|| RepoError::unavailable("not cloned"))?;

        match self.staged.lock().take() {
            Some(next) => {
                let to = next.commit().clone();
                *self.working_copy.lock() = next.paths().map(str::to_string).collect();
                *head = Some(next);
                Ok(PullOutcome::Updated { from, to })
            },
            None => Ok(PullOutcome::UpToDate { head: from }),
        }
    }
}

#[async_trait]
impl RepositoryClient for FakeRepository {
    async fn pull(&self) -> Result<PullOutcome, RepoError> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if self.gated.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }

        let result = if self.fail_pull.load(Ordering::SeqCst) {
            Err(RepoError::git("remote hung up"))
        } else {
            self.advance()
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn head_tree(&self) -> Result<TreeSnapshot, RepoError> {
        self.head
            .lock()
            .clone()
            .ok_or_else(|| RepoError::unavailable("not cloned"))
    }

    async fn resolve_tree(&self, commit: &CommitId) -> Result<TreeSnapshot, RepoError> {
        self.trees
            .lock()
            .get(commit)
            .cloned()
            .ok_or_else(|| RepoError::CommitNotFound(commit.to_string()))
    }

    async fn working_copy_contains(&self, path: &str) -> Result<bool, RepoError> {
        Ok(self.working_copy.lock().contains(path))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub struct Harness {
    pub store: Arc<RecordingStore>,
    pub repo: Arc<FakeRepository>,
    pub engine: Arc<SyncEngine>,
}

pub fn harness(store: RecordingStore, repo: FakeRepository) -> Harness {
    let store = Arc::new(store);
    let repo = Arc::new(repo);
    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&repo) as Arc<dyn RepositoryClient>,
        Arc::clone(&store) as Arc<dyn StoreClient>,
    ));
    Harness {
        store,
        repo,
        engine,
    }
}
