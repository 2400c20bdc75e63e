//! sync::coordinator
//!
//! Single source of truth for a project's remote-relative state.
//!
//! # Concurrency
//!
//! The coordinator is shared as `Arc<SyncCoordinator>` between the
//! background poller, guarded operations and user-triggered actions.
//!
//! - State lives behind a `std::sync::Mutex` that is never held across an
//!   await point. Readers get a cloned snapshot.
//! - `fetch`, `pull` and `push` each own an async mutex. The public methods
//!   `try_lock` it and return `false` when the operation is already in
//!   flight; internal callers that must not be rejected wait for it instead.
//! - Every pull, including the poller's automatic catch-up, goes through the
//!   same pull mutex, and the safety check happens while holding it.
//! - Guarded operations are serialized by a fourth mutex. While one holds it,
//!   [`SyncCoordinator::is_operation_running`] is true and the poller skips
//!   its ticks.
//!
//! # Failure semantics
//!
//! Public methods never return errors. Each provider failure becomes a
//! `false`/empty return plus a [`Notification`]. Network failures on fetch
//! only flip `is_offline`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::notify::{Notification, Notifier};
use super::state::SyncState;
use crate::core::types::{BranchName, UtcTimestamp};
use crate::git::{CommitInfo, VcsError, VersionControlProvider};
use crate::project::ProjectDataProvider;

/// Shown when a fast-forward is impossible.
const DIVERGED_MESSAGE: &str = "The remote has changes that conflict with your local commits. \
     Push your changes to a separate branch and consider opening a pull request.";

/// Coordinates fetch, pull, push and branch switching for one project.
pub struct SyncCoordinator {
    project_id: String,
    /// `None` once the project is closed
    path: Mutex<Option<PathBuf>>,
    vcs: Arc<dyn VersionControlProvider>,
    project: Arc<dyn ProjectDataProvider>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<SyncState>,
    fetch_lock: AsyncMutex<()>,
    pull_lock: AsyncMutex<()>,
    push_lock: AsyncMutex<()>,
    operation_lock: AsyncMutex<()>,
    operation_running: AtomicBool,
    pub(super) poller: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("project_id", &self.project_id)
            .field("path", &self.path())
            .field("provider", &self.vcs.name())
            .field("state", &self.state())
            .finish()
    }
}

/// Marks a guarded operation in flight; clears the flag when dropped.
pub struct OperationPermit<'a> {
    _lock: AsyncMutexGuard<'a, ()>,
    running: &'a AtomicBool,
}

impl Drop for OperationPermit<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl SyncCoordinator {
    /// Create a coordinator for the project at `path`.
    ///
    /// State starts empty; call [`initialize`](Self::initialize) to populate it.
    pub fn new(
        project_id: impl Into<String>,
        path: impl Into<PathBuf>,
        vcs: Arc<dyn VersionControlProvider>,
        project: Arc<dyn ProjectDataProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            project_id: project_id.into(),
            path: Mutex::new(Some(path.into())),
            vcs,
            project,
            notifier,
            state: Mutex::new(SyncState::default()),
            fetch_lock: AsyncMutex::new(()),
            pull_lock: AsyncMutex::new(()),
            push_lock: AsyncMutex::new(()),
            operation_lock: AsyncMutex::new(()),
            operation_running: AtomicBool::new(false),
            poller: Mutex::new(None),
        })
    }

    /// Populate state from the working copy: status, conflict flag, branches.
    pub async fn initialize(&self) {
        self.refresh_status().await;
        self.refresh_branches().await;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Project directory, or `None` after [`close`](Self::close).
    pub fn path(&self) -> Option<PathBuf> {
        lock(&self.path).clone()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SyncState {
        self.state_mut().clone()
    }

    fn state_mut(&self) -> MutexGuard<'_, SyncState> {
        lock(&self.state)
    }

    pub fn is_fetching(&self) -> bool {
        self.fetch_lock.try_lock().is_err()
    }

    pub fn is_pulling(&self) -> bool {
        self.pull_lock.try_lock().is_err()
    }

    pub fn is_pushing(&self) -> bool {
        self.push_lock.try_lock().is_err()
    }

    /// Whether a guarded operation holds the operation lock.
    pub fn is_operation_running(&self) -> bool {
        self.operation_running.load(Ordering::SeqCst)
    }

    /// Update the in-memory auto-save preference.
    pub fn set_auto_save(&self, enabled: bool) {
        self.state_mut().auto_save = enabled;
    }

    pub(crate) fn provider(&self) -> &Arc<dyn VersionControlProvider> {
        &self.vcs
    }

    pub(crate) fn project(&self) -> &Arc<dyn ProjectDataProvider> {
        &self.project
    }

    pub(crate) fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    // =========================================================================
    // Fetch / pull / push
    // =========================================================================

    /// Fetch from the remote.
    ///
    /// Returns `false` without doing anything when the project is closed or
    /// a fetch is already in flight.
    pub async fn fetch(&self) -> bool {
        let Some(path) = self.path() else {
            return false;
        };
        let Ok(_guard) = self.fetch_lock.try_lock() else {
            debug!("fetch already in flight");
            return false;
        };
        self.fetch_locked(&path).await
    }

    /// Fetch, waiting for an in-flight fetch to finish first.
    pub(crate) async fn fetch_waiting(&self) -> bool {
        let Some(path) = self.path() else {
            return false;
        };
        let _guard = self.fetch_lock.lock().await;
        self.fetch_locked(&path).await
    }

    #[instrument(skip_all, fields(project = %self.project_id))]
    async fn fetch_locked(&self, path: &Path) -> bool {
        match self.vcs.fetch(path).await {
            Ok(()) => {
                {
                    let mut state = self.state_mut();
                    state.last_fetch_time = Some(UtcTimestamp::now());
                    state.is_offline = false;
                }
                self.refresh_status().await;
                true
            }
            Err(err) if err.is_network() => {
                debug!(%err, "remote unreachable");
                self.state_mut().is_offline = true;
                false
            }
            Err(err) => {
                warn!(%err, "fetch failed");
                self.notify(Notification::error("Fetch failed", err.to_string()));
                false
            }
        }
    }

    /// Fast-forward pull.
    ///
    /// On divergence the working copy and state are left untouched.
    pub async fn pull(&self) -> bool {
        let Some(path) = self.path() else {
            return false;
        };
        let Ok(_guard) = self.pull_lock.try_lock() else {
            debug!("pull already in flight");
            return false;
        };
        self.pull_locked(&path).await
    }

    /// Pull, waiting for an in-flight pull to finish first.
    pub(crate) async fn pull_waiting(&self) -> bool {
        let Some(path) = self.path() else {
            return false;
        };
        let _guard = self.pull_lock.lock().await;
        self.pull_locked(&path).await
    }

    #[instrument(skip_all, fields(project = %self.project_id))]
    async fn pull_locked(&self, path: &Path) -> bool {
        match self.vcs.pull(path, true).await {
            Ok(()) => {
                info!("pulled");
                self.refresh_status().await;
                true
            }
            Err(VcsError::Diverged) => {
                warn!("pull refused: diverged");
                self.notify(Notification::error("Cannot pull", DIVERGED_MESSAGE));
                false
            }
            Err(err) => {
                warn!(%err, "pull failed");
                self.notify(Notification::error("Pull failed", err.to_string()));
                false
            }
        }
    }

    /// Pull iff it is safe: behind, not ahead, clean tree, and no guarded
    /// operation in flight.
    ///
    /// The check runs while holding the pull lock, so it cannot race a
    /// user-initiated pull.
    pub async fn auto_sync_if_safe(&self) -> bool {
        if self.is_operation_running() {
            return false;
        }
        let Some(path) = self.path() else {
            return false;
        };
        let Ok(_guard) = self.pull_lock.try_lock() else {
            return false;
        };
        if self.is_operation_running() || !self.state().is_safe_to_auto_pull() {
            return false;
        }
        debug!("auto-sync pulling");
        self.pull_locked(&path).await
    }

    /// Push the current branch.
    ///
    /// Refused while diverged.
    pub async fn push(&self) -> bool {
        let Some(path) = self.path() else {
            return false;
        };
        let Ok(_guard) = self.push_lock.try_lock() else {
            debug!("push already in flight");
            return false;
        };
        self.push_locked(&path).await
    }

    /// Push, waiting for an in-flight push to finish first.
    pub(crate) async fn push_waiting(&self) -> bool {
        let Some(path) = self.path() else {
            return false;
        };
        let _guard = self.push_lock.lock().await;
        self.push_locked(&path).await
    }

    #[instrument(skip_all, fields(project = %self.project_id))]
    async fn push_locked(&self, path: &Path) -> bool {
        if self.state().is_diverged() {
            self.notify(Notification::error("Cannot push", DIVERGED_MESSAGE));
            return false;
        }
        match self.vcs.push(path).await {
            Ok(()) => {
                info!("pushed");
                self.refresh_status().await;
                let branch = self.state().current_branch;
                self.notify(Notification::success(
                    "Changes pushed",
                    format!("'{branch}' is up to date with the remote"),
                ));
                true
            }
            Err(err) => {
                warn!(%err, "push failed");
                self.notify(Notification::error("Push failed", err.to_string()));
                false
            }
        }
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Refresh status from one provider round trip, then the conflict flag.
    ///
    /// Returns `false` if the status query failed; state is then unchanged.
    pub async fn refresh_status(&self) -> bool {
        let Some(path) = self.path() else {
            return false;
        };

        let status = match self.vcs.status(&path).await {
            Ok(status) => status,
            Err(err) => {
                warn!(%err, "status refresh failed");
                return false;
            }
        };
        self.state_mut().apply_status(&status);

        if let Err(err) = self.project.refresh_git_status(&status).await {
            debug!(%err, "project status mirror failed");
        }

        match self.vcs.has_merge_conflict(&path).await {
            Ok(conflict) => self.state_mut().has_merge_conflict = conflict,
            Err(err) => debug!(%err, "merge state query failed"),
        }
        true
    }

    /// Refresh the branch list.
    pub async fn refresh_branches(&self) -> bool {
        let Some(path) = self.path() else {
            return false;
        };
        match self.vcs.list_branches(&path).await {
            Ok(listing) => {
                self.state_mut().branches = listing.branches;
                true
            }
            Err(err) => {
                warn!(%err, "branch refresh failed");
                false
            }
        }
    }

    // =========================================================================
    // Branches and merge state
    // =========================================================================

    /// Check out `branch` and reload project data.
    ///
    /// Refused when the working tree has uncommitted changes.
    #[instrument(skip(self), fields(project = %self.project_id))]
    pub async fn switch_branch(&self, branch: &BranchName) -> bool {
        let Some(path) = self.path() else {
            return false;
        };

        match self.vcs.dirty_state(&path).await {
            Ok(false) => {}
            Ok(true) => {
                self.notify(Notification::error(
                    "Cannot switch branch",
                    "You have uncommitted changes. Commit or discard them before switching branches.",
                ));
                return false;
            }
            Err(err) => {
                self.notify(Notification::error("Cannot switch branch", err.to_string()));
                return false;
            }
        }

        if let Err(err) = self.vcs.checkout(&path, branch).await {
            warn!(%err, "checkout failed");
            self.notify(Notification::error("Switch failed", err.to_string()));
            return false;
        }
        self.state_mut().current_branch = branch.to_string();

        self.reload_project().await;
        self.refresh_branches().await;
        self.refresh_status().await;
        true
    }

    /// Full reload of domain data after the files on disk changed.
    pub(crate) async fn reload_project(&self) {
        if let Err(err) = self.project.load_project(&self.project_id).await {
            warn!(%err, "project reload failed");
            self.notify(Notification::warning("Reload failed", err.to_string()));
        }
    }

    /// Abort an in-progress merge.
    pub async fn abort_merge(&self) -> bool {
        let Some(path) = self.path() else {
            return false;
        };
        match self.vcs.abort_merge(&path).await {
            Ok(()) => {
                self.state_mut().has_merge_conflict = false;
                self.refresh_status().await;
                true
            }
            Err(err) => {
                self.notify(Notification::error("Abort merge failed", err.to_string()));
                false
            }
        }
    }

    /// The latest `count` commits on HEAD; empty on failure.
    pub async fn recent_commits(&self, count: usize) -> Vec<CommitInfo> {
        let Some(path) = self.path() else {
            return Vec::new();
        };
        self.vcs.log(&path, count).await.unwrap_or_else(|err| {
            debug!(%err, "log failed");
            Vec::new()
        })
    }

    // =========================================================================
    // Guarded operations
    // =========================================================================

    /// Wait for exclusive use of the working copy for a guarded operation.
    pub(crate) async fn begin_operation(&self) -> OperationPermit<'_> {
        let guard = self.operation_lock.lock().await;
        self.operation_running.store(true, Ordering::SeqCst);
        OperationPermit {
            _lock: guard,
            running: &self.operation_running,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stop polling, reset state and detach from the project directory.
    ///
    /// Every method is a no-op afterwards.
    pub fn close(&self) {
        self.stop_background_fetch();
        let auto_save = {
            let mut path = lock(&self.path);
            *path = None;
            self.state().auto_save
        };
        *self.state_mut() = SyncState::new(auto_save);
        debug!(project = %self.project_id, "closed");
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.path).is_none()
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.poller).take() {
            handle.abort();
        }
    }
}

pub(super) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
