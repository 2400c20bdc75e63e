//! guard
//!
//! Runs mutating domain operations against an up-to-date working copy.
//!
//! # Algorithm
//!
//! 1. Wait for exclusive use of the working copy. Guarded operations are
//!    queued, never overlapped, and the background poller stands down.
//! 2. With a remote: fetch (waiting out any in-flight fetch), then
//!    - diverged: refuse;
//!    - behind with a clean tree and nothing to push: fast-forward pull,
//!      refusing if the pull fails;
//!    - behind with uncommitted changes: refuse.
//! 3. Run the operation.
//! 4. Refresh status, whatever the outcome.
//! 5. If the operation succeeded, auto-save is on and there are local
//!    commits to push: push.
//!
//! A refused operation is never invoked. The operation's own errors are
//! returned to the caller after cleanup.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info_span, Instrument};

use crate::sync::{Notification, SyncCoordinator};

/// Wraps operations with pre-sync and post-operation auto-save.
#[derive(Debug, Clone)]
pub struct OperationGuard {
    sync: Arc<SyncCoordinator>,
}

impl OperationGuard {
    pub fn new(sync: Arc<SyncCoordinator>) -> Self {
        Self { sync }
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.sync
    }

    /// Run `op` once the working copy is known to be neither behind nor
    /// diverged.
    ///
    /// Returns `Ok(None)` when the operation was refused (a notification
    /// explains why), `Ok(Some(value))` when it ran, and the operation's own
    /// error otherwise.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use reposync::git::mock::MockVcs;
    /// use reposync::guard::OperationGuard;
    /// use reposync::project::mock::MockProject;
    /// use reposync::sync::{SilentNotifier, SyncCoordinator};
    ///
    /// # tokio_test::block_on(async {
    /// let sync = SyncCoordinator::new(
    ///     "p", "/p",
    ///     Arc::new(MockVcs::new()),
    ///     Arc::new(MockProject::new()),
    ///     Arc::new(SilentNotifier),
    /// );
    /// let guard = OperationGuard::new(sync);
    /// let out = guard.run(|| async { Ok::<_, std::io::Error>(7) }).await.unwrap();
    /// assert_eq!(out, Some(7));
    /// # });
    /// ```
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<Option<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let span = info_span!("guarded_operation", project = %self.sync.project_id());
        async move {
            let _permit = self.sync.begin_operation().await;

            if !self.pre_sync().await {
                return Ok(None);
            }

            let result = op().await;

            self.sync.refresh_status().await;
            if result.is_ok() {
                self.auto_save().await;
            }
            result.map(Some)
        }
        .instrument(span)
        .await
    }

    /// Bring the working copy up to date. Returns `false` to refuse.
    async fn pre_sync(&self) -> bool {
        if self.sync.is_closed() {
            return false;
        }
        if !self.sync.state().has_remote() {
            debug!("no remote, skipping pre-sync");
            return true;
        }

        self.sync.fetch_waiting().await;
        let state = self.sync.state();

        if state.is_diverged() {
            self.sync.notify(Notification::error(
                "Operation not started",
                "Your local branch and the remote have diverged. \
                 Push your changes or open a pull request first.",
            ));
            return false;
        }

        if state.can_pull() {
            if !state.is_clean {
                self.sync.notify(Notification::error(
                    "Operation not started",
                    "The remote has new changes but you have uncommitted changes. \
                     Commit or discard them first.",
                ));
                return false;
            }
            if !self.sync.pull_waiting().await {
                self.sync.notify(Notification::error(
                    "Operation not started",
                    "Could not bring the project up to date with the remote.",
                ));
                return false;
            }
        }
        true
    }

    async fn auto_save(&self) {
        let state = self.sync.state();
        if state.has_remote() && state.auto_save && state.ahead > 0 && !state.is_diverged() {
            debug!(ahead = state.ahead, "auto-saving");
            self.sync.push_waiting().await;
        }
    }
}
