//! Working copy operations using gix (pure Rust).

use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gix::bstr::ByteSlice;
use gix::refs::transaction::PreviousValue;
use gix::remote::fetch::Shallow;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::{CommitId, RepoAuth, RepoConfig};
use crate::client::{PullOutcome, RepositoryClient};
use crate::error::RepoError;
use crate::snapshot::{TreeSnapshot, validate_repo_path};

/// State of the working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoState {
    /// Repository has not been cloned yet.
    NotCloned,
    /// Repository is currently being cloned.
    Cloning,
    /// Repository is ready for use.
    Ready,
    /// A pull is running.
    Updating,
    /// Cloning failed.
    Error(String),
}

/// A local working copy of one branch.
///
/// Uses gix (pure Rust) for all Git operations - no system git required.
/// The working copy is a read-only mirror: `pull` moves the local branch to
/// the remote tip and rewrites the checked-out files, discarding anything
/// local.
pub struct GitRepository {
    config: RepoConfig,
    state: Arc<RwLock<RepoState>>,
}

impl GitRepository {
    /// Creates a handle without touching the disk.
    pub fn new(config: RepoConfig) -> Self {
        let state = if config.local_path().join(".git").exists() {
            RepoState::Ready
        } else {
            RepoState::NotCloned
        };

        Self {
            config,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Opens the working copy at the configured path, cloning it first if
    /// it does not exist yet.
    ///
    /// # Errors
    ///
    /// Fails if the repository can neither be opened nor cloned.
    pub async fn open_or_clone(config: RepoConfig) -> Result<Self, RepoError> {
        if let RepoAuth::Ssh {
            passphrase: Some(_),
            ..
        } = config.auth()
        {
            warn!("SSH key passphrases are not passed to ssh, load the key into ssh-agent");
        }

        let repo = Self::new(config);

        if repo.exists_locally() {
            let local_path = repo.local_path().to_path_buf();
            let auth = repo.config.auth().clone();

            let opened = tokio::task::spawn_blocking(move || {
                Self::open_blocking(&local_path, &auth).map(|_| ())
            })
            .await
            .map_err(|e| RepoError::git(format!("Open task failed: {}", e)))?;

            match opened {
                Ok(()) => {
                    info!(path = ?repo.local_path(), "Opened existing working copy");
                    return Ok(repo);
                },
                Err(e) => {
                    warn!(error = %e, "Couldn't open working copy, trying to clone it");
                    *repo.state.write() = RepoState::NotCloned;
                },
            }
        }

        repo.clone_repo().await?;
        Ok(repo)
    }

    /// Returns the current working copy state.
    pub fn state(&self) -> RepoState {
        self.state.read().clone()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Returns the working copy path.
    pub fn local_path(&self) -> &Path {
        self.config.local_path()
    }

    /// Checks if the repository exists locally.
    pub fn exists_locally(&self) -> bool {
        self.config.local_path().join(".git").exists()
    }

    /// Returns the current HEAD commit.
    pub async fn head_commit(&self) -> Result<CommitId, RepoError> {
        let local_path = self.config.local_path().to_path_buf();
        let auth = self.config.auth().clone();

        tokio::task::spawn_blocking(move || {
            let repo = Self::open_blocking(&local_path, &auth)?;
            Self::head_id(&repo).map(CommitId::from)
        })
        .await
        .map_err(|e| RepoError::git(format!("Task failed: {}", e)))?
    }

    /// Clones the repository.
    async fn clone_repo(&self) -> Result<(), RepoError> {
        *self.state.write() = RepoState::Cloning;

        let url = self.config.url().to_string();
        let local_path = self.config.local_path().to_path_buf();
        let branch = self.config.branch().to_string();
        let auth = self.config.auth().clone();

        info!(
            url = %redact_url(&url),
            branch = %branch,
            path = ?local_path,
            "Cloning repository"
        );

        let result = run_interruptible(self.config.clone_timeout(), "Clone", move |interrupt| {
            Self::clone_blocking(&url, &local_path, &branch, &auth, interrupt)
        })
        .await;

        match result {
            Ok(()) => {
                *self.state.write() = RepoState::Ready;
                info!("Repository cloned successfully");
                Ok(())
            },
            Err(e) => {
                *self.state.write() = RepoState::Error(e.to_string());
                Err(e)
            },
        }
    }

    /// Open options carrying the SSH identity, if any.
    fn open_options(auth: &RepoAuth) -> gix::open::Options {
        let mut overrides = Vec::new();
        if let RepoAuth::Ssh { key, .. } = auth {
            overrides.push(format!(
                "core.sshCommand=ssh -i '{}' -o IdentitiesOnly=yes",
                key.display()
            ));
        }
        gix::open::Options::default().config_overrides(overrides)
    }

    fn open_blocking(local_path: &Path, auth: &RepoAuth) -> Result<gix::Repository, RepoError> {
        gix::open_opts(local_path, Self::open_options(auth))
            .map_err(|e| RepoError::unavailable(format!("Failed to open repo: {}", e)))
    }

    /// Blocking clone operation using gix.
    fn clone_blocking(
        url: &str,
        local_path: &Path,
        branch: &str,
        auth: &RepoAuth,
        interrupt: &AtomicBool,
    ) -> Result<(), RepoError> {
        if let Some(parent) = local_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RepoError::io(parent, e))?;
        }

        let mut url = gix::url::parse(url.into())
            .map_err(|e| RepoError::InvalidConfig(format!("Invalid URL: {}", e)))?;

        // Basic credentials travel in the remote URL so later fetches reuse them.
        if let RepoAuth::Http { username, password } = auth {
            url.set_user(Some(username.clone()));
            url.set_password(Some(password.clone()));
        }

        let mut prepare = gix::clone::PrepareFetch::new(
            url,
            local_path,
            gix::create::Kind::WithWorktree,
            gix::create::Options::default(),
            Self::open_options(auth),
        )
        .map_err(|e| RepoError::git(format!("Failed to prepare clone: {}", e)))?
        // Later fetches bring every commit between the local head and the new
        // tip, which covers any `after` a push names.
        .with_shallow(Shallow::DepthAtRemote(NonZeroU32::MIN))
        .with_ref_name(Some(branch))
        .map_err(|e| RepoError::InvalidConfig(format!("Invalid branch {}: {}", branch, e)))?;

        let (mut checkout, _outcome) = prepare
            .fetch_then_checkout(gix::progress::Discard, interrupt)
            .map_err(|e| RepoError::unavailable(format!("Clone failed: {}", e)))?;

        let (_repo, _outcome) = checkout
            .main_worktree(gix::progress::Discard, interrupt)
            .map_err(|e| RepoError::git(format!("Checkout failed: {}", e)))?;

        Ok(())
    }

    /// Blocking fetch from the default remote.
    fn fetch_blocking(repo: &gix::Repository, interrupt: &AtomicBool) -> Result<(), RepoError> {
        let remote = repo
            .find_default_remote(gix::remote::Direction::Fetch)
            .ok_or_else(|| RepoError::git("No default remote found"))?
            .map_err(|e| RepoError::git(format!("Failed to find remote: {}", e)))?;

        remote
            .connect(gix::remote::Direction::Fetch)
            .map_err(|e| RepoError::unavailable(format!("Failed to connect: {}", e)))?
            .prepare_fetch(gix::progress::Discard, Default::default())
            .map_err(|e| RepoError::unavailable(format!("Failed to prepare fetch: {}", e)))?
            .receive(gix::progress::Discard, interrupt)
            .map_err(|e| RepoError::unavailable(format!("Fetch failed: {}", e)))?;

        Ok(())
    }

    /// Blocking pull: fetch, move the local branch to the remote tip and
    /// rewrite the working copy files.
    fn pull_blocking(
        local_path: &Path,
        auth: &RepoAuth,
        local_ref: &str,
        remote_ref: &str,
        interrupt: &AtomicBool,
    ) -> Result<PullOutcome, RepoError> {
        let repo = Self::open_blocking(local_path, auth)?;
        Self::fetch_blocking(&repo, interrupt)?;
        let before = Self::head_id(&repo)?;

        let target = repo
            .find_reference(remote_ref)
            .map_err(|e| RepoError::git(format!("Remote branch {} not found: {}", remote_ref, e)))?
            .into_fully_peeled_id()
            .map_err(|e| RepoError::git(format!("Failed to peel reference: {}", e)))?
            .detach();

        if target == before {
            return Ok(PullOutcome::UpToDate {
                head: before.into(),
            });
        }

        let old_tree = Self::snapshot_blocking(&repo, before)?;
        let new_tree = Self::snapshot_blocking(&repo, target)?;

        // The branch only moves once the files are in place, so a failed
        // rewrite is retried by the next pull.
        materialize(local_path, &old_tree, &new_tree)?;

        repo.reference(
            local_ref,
            target,
            PreviousValue::Any,
            format!("pull: fast-forward to {}", target),
        )
        .map_err(|e| RepoError::git(format!("Failed to update {}: {}", local_ref, e)))?;

        Ok(PullOutcome::Updated {
            from: before.into(),
            to: target.into(),
        })
    }

    /// Gets the HEAD commit id.
    fn head_id(repo: &gix::Repository) -> Result<gix::ObjectId, RepoError> {
        repo.head_id()
            .map(|id| id.detach())
            .map_err(|e| RepoError::git(format!("Failed to get HEAD: {}", e)))
    }

    /// Reads every blob reachable from the commit's tree.
    fn snapshot_blocking(
        repo: &gix::Repository,
        commit: gix::ObjectId,
    ) -> Result<TreeSnapshot, RepoError> {
        let tree = repo
            .find_commit(commit)
            .map_err(|_| RepoError::CommitNotFound(commit.to_string()))?
            .tree()
            .map_err(|e| RepoError::git(format!("Failed to get commit tree: {}", e)))?;

        let mut recorder = gix::traverse::tree::Recorder::default();
        tree.traverse()
            .breadthfirst(&mut recorder)
            .map_err(|e| RepoError::git(format!("Failed to walk tree: {}", e)))?;

        let mut files = BTreeMap::new();
        for entry in recorder.records {
            // Directories, symlinks and submodules carry no file contents.
            if !entry.mode.is_blob() {
                continue;
            }

            let Ok(path) = entry.filepath.to_str() else {
                warn!(path = %entry.filepath, "Skipping file with non UTF-8 path");
                continue;
            };

            let data = repo
                .find_object(entry.oid)
                .map_err(|e| RepoError::git(format!("Failed to read {}: {}", path, e)))?
                .detach()
                .data;

            files.insert(path.to_owned(), data);
        }

        debug!(commit = %commit, files = files.len(), "Tree snapshot built");

        Ok(TreeSnapshot::new(commit.into(), files))
    }
}

#[async_trait]
impl RepositoryClient for GitRepository {
    async fn pull(&self) -> Result<PullOutcome, RepoError> {
        {
            let mut state = self.state.write();
            match &*state {
                RepoState::Ready => *state = RepoState::Updating,
                RepoState::Updating | RepoState::Cloning => return Err(RepoError::Busy),
                RepoState::NotCloned => return Err(RepoError::unavailable("repository not cloned")),
                RepoState::Error(msg) => return Err(RepoError::unavailable(msg.clone())),
            }
        }
        let guard = UpdateGuard(Arc::clone(&self.state));

        let local_path = self.config.local_path().to_path_buf();
        let auth = self.config.auth().clone();
        let local_ref = self.config.local_ref();
        let remote_ref = self.config.remote_ref();

        debug!(path = ?local_path, "Pulling working copy");

        // The guard travels with the blocking work: if this future is dropped,
        // the working copy stays `Updating` until that work has stopped.
        let result = run_interruptible(self.config.fetch_timeout(), "Pull", move |interrupt| {
            let _guard = guard;
            Self::pull_blocking(&local_path, &auth, &local_ref, &remote_ref, interrupt)
        })
        .await;

        match &result {
            Ok(PullOutcome::Updated { from, to }) => {
                info!(from = %from, to = %to, "Working copy updated");
            },
            Ok(PullOutcome::UpToDate { head }) => {
                debug!(head = %head, "Working copy already up to date");
            },
            Err(e) => warn!(error = %e, "Pull failed"),
        }

        result
    }

    async fn head_tree(&self) -> Result<TreeSnapshot, RepoError> {
        let local_path = self.config.local_path().to_path_buf();
        let auth = self.config.auth().clone();

        tokio::task::spawn_blocking(move || {
            let repo = Self::open_blocking(&local_path, &auth)?;
            let head = Self::head_id(&repo)?;
            Self::snapshot_blocking(&repo, head)
        })
        .await
        .map_err(|e| RepoError::git(format!("Task failed: {}", e)))?
    }

    async fn resolve_tree(&self, commit: &CommitId) -> Result<TreeSnapshot, RepoError> {
        let oid = commit.to_object_id()?;
        let local_path = self.config.local_path().to_path_buf();
        let auth = self.config.auth().clone();

        tokio::task::spawn_blocking(move || {
            let repo = Self::open_blocking(&local_path, &auth)?;
            Self::snapshot_blocking(&repo, oid)
        })
        .await
        .map_err(|e| RepoError::git(format!("Task failed: {}", e)))?
    }

    async fn working_copy_contains(&self, path: &str) -> Result<bool, RepoError> {
        let full = self.config.local_path().join(validate_repo_path(path)?);

        match tokio::fs::symlink_metadata(&full).await {
            Ok(meta) => Ok(!meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RepoError::io(full, e)),
        }
    }
}

/// Sets the working copy back to `Ready` when dropped.
struct UpdateGuard(Arc<RwLock<RepoState>>);

impl Drop for UpdateGuard {
    fn drop(&mut self) {
        *self.0.write() = RepoState::Ready;
    }
}

/// Raises the interrupt flag when dropped.
struct InterruptOnDrop(Arc<AtomicBool>);

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Runs a blocking network operation with a deadline.
///
/// On timeout the operation is asked to stop through its interrupt flag and
/// awaited, so the working copy is never touched by two tasks at once. If
/// the returned future is dropped instead, the flag is raised as well and
/// the operation stops at its next check.
async fn run_interruptible<T, F>(timeout: Duration, op: &'static str, f: F) -> Result<T, RepoError>
where
    F: FnOnce(&AtomicBool) -> Result<T, RepoError> + Send + 'static,
    T: Send + 'static,
{
    let interrupt = InterruptOnDrop(Arc::new(AtomicBool::new(false)));
    let flag = Arc::clone(&interrupt.0);
    let mut handle = tokio::task::spawn_blocking(move || f(&flag));

    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(joined) => joined.map_err(|e| RepoError::git(format!("{} task failed: {}", op, e)))?,
        Err(_) => {
            warn!(timeout = ?timeout, "{} timed out, interrupting", op);
            interrupt.0.store(true, Ordering::SeqCst);
            let _ = handle.await;
            Err(RepoError::Timeout {
                seconds: timeout.as_secs(),
            })
        },
    }
}

/// Rewrites the working copy from `old` to `new`.
///
/// Files that are no longer in `new` are removed first, along with
/// directories that become empty, so a path can switch between file and
/// directory. Files whose contents did not change are left alone. Anything
/// occupying a target path with the wrong kind of entry is cleared before
/// the write.
fn materialize(root: &Path, old: &TreeSnapshot, new: &TreeSnapshot) -> Result<(), RepoError> {
    for path in old.paths().filter(|p| !new.contains(p)) {
        let target = root.join(validate_repo_path(path)?);
        match std::fs::remove_file(&target) {
            Ok(()) => {},
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(_) if target.is_dir() => {},
            Err(e) => return Err(RepoError::io(&target, e)),
        }

        let mut dir = target.parent();
        while let Some(d) = dir {
            if d == root || std::fs::remove_dir(d).is_err() {
                break;
            }
            dir = d.parent();
        }
    }

    for (path, contents) in new.files() {
        let target = root.join(validate_repo_path(path)?);
        let unchanged = old.file_bytes(path).is_ok_and(|before| before == contents);
        if unchanged && target.is_file() {
            continue;
        }

        clear_blockers(root, &target)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RepoError::io(parent, e))?;
        }
        std::fs::write(&target, contents).map_err(|e| RepoError::io(&target, e))?;
    }

    Ok(())
}

/// Removes a non-directory sitting where a parent directory of `target`
/// belongs, or a directory sitting at `target` itself.
fn clear_blockers(root: &Path, target: &Path) -> Result<(), RepoError> {
    let Ok(relative) = target.strip_prefix(root) else {
        return Ok(());
    };

    let mut current = root.to_path_buf();
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        current.push(component);
        let Ok(meta) = std::fs::symlink_metadata(&current) else {
            return Ok(());
        };

        if components.peek().is_none() {
            if meta.is_dir() {
                std::fs::remove_dir_all(&current).map_err(|e| RepoError::io(&current, e))?;
            }
        } else if !meta.is_dir() {
            std::fs::remove_file(&current).map_err(|e| RepoError::io(&current, e))?;
            return Ok(());
        }
    }

    Ok(())
}

/// Strips credentials from a URL before it is logged.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        },
        _ => url.to_string(),
    }
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("url", &redact_url(self.config.url()))
            .field("branch", &self.config.branch())
            .field("local_path", &self.config.local_path())
            .field("state", &self.state())
            .finish()
    }
}
