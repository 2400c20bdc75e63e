//! workflow
//!
//! The two-branch publishing model.
//!
//! # Model
//!
//! `dev` is where work happens; `main` only receives fast-forwards of `dev`
//! ("publishing") and is what releases are cut from. No other long-lived
//! branch takes part.
//!
//! ```text
//!   main <--switch--> dev
//!   dev --publish--> main   (dev is checked out again afterwards)
//! ```
//!
//! Structural git changes go through the provider; anything touching the
//! remote goes through the [`SyncCoordinator`]. Informational queries (branch
//! diff, record delta, release list) keep their previous value when they
//! fail.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::core::types::{BranchName, ReleaseTag, VersionBump};
use crate::forge::{CreateReleaseRequest, Release, ReleaseHost};
use crate::project::BranchDelta;
use crate::sync::{Notification, SyncCoordinator};

/// Commit counts between `dev` and `main`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BranchDiff {
    pub dev_ahead_of_main: usize,
    pub main_ahead_of_dev: usize,
}

impl BranchDiff {
    pub fn in_sync(&self) -> bool {
        self.dev_ahead_of_main == 0 && self.main_ahead_of_dev == 0
    }
}

#[derive(Debug, Default)]
struct WorkflowCache {
    branch_diff: Option<BranchDiff>,
    branch_delta: Option<BranchDelta>,
    /// Delta requests in flight
    loading_delta: usize,
    /// Newest first
    releases: Vec<Release>,
}

/// Dev/main workflow and releases on top of a coordinator.
pub struct BranchWorkflow {
    sync: Arc<SyncCoordinator>,
    releases: Option<Arc<dyn ReleaseHost>>,
    cache: Mutex<WorkflowCache>,
}

impl std::fmt::Debug for BranchWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchWorkflow")
            .field("release_host", &self.releases.as_ref().map(|h| h.name()))
            .finish_non_exhaustive()
    }
}

impl BranchWorkflow {
    /// `releases` is `None` when the remote is not on a recognized forge.
    pub fn new(sync: Arc<SyncCoordinator>, releases: Option<Arc<dyn ReleaseHost>>) -> Self {
        Self {
            sync,
            releases,
            cache: Mutex::new(WorkflowCache::default()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, WorkflowCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn has_release_host(&self) -> bool {
        self.releases.is_some()
    }

    pub fn branch_diff(&self) -> Option<BranchDiff> {
        self.cache().branch_diff
    }

    pub fn branch_delta(&self) -> Option<BranchDelta> {
        self.cache().branch_delta.clone()
    }

    pub fn is_loading_delta(&self) -> bool {
        self.cache().loading_delta > 0
    }

    /// Cached releases, newest first.
    pub fn releases(&self) -> Vec<Release> {
        self.cache().releases.clone()
    }

    /// Fill the caches when a project is opened: branch diff, then releases
    /// if there is a release host.
    pub async fn initialize(&self) {
        self.refresh_branch_diff().await;
        if self.has_release_host() {
            self.load_releases().await;
        }
    }

    // =========================================================================
    // Branches
    // =========================================================================

    /// Make sure `dev` exists locally and is checked out.
    ///
    /// Idempotent: returns `true` straight away when `dev` already exists.
    /// When the remote already has `dev`, it is checked out tracking the
    /// remote branch. Otherwise `dev` is created from `main` and, with a
    /// remote, pushed; a failed push returns `false`.
    #[instrument(skip_all)]
    pub async fn ensure_dev_branch(&self) -> bool {
        let Some(path) = self.sync.path() else {
            return false;
        };
        let dev = BranchName::dev();

        self.sync.refresh_branches().await;
        if self.sync.state().has_local_branch(&dev) {
            return true;
        }

        let vcs = self.sync.provider();
        if self.sync.state().has_remote() {
            self.sync.fetch_waiting().await;
            self.sync.refresh_branches().await;
        }

        if self.sync.state().has_remote_branch(vcs.remote_name(), &dev) {
            if let Err(err) = vcs.checkout_tracking(&path, &dev).await {
                warn!(%err, "checking out remote dev failed");
                self.sync
                    .notify(Notification::error("Could not switch to dev", err.to_string()));
                return false;
            }
            info!("checked out dev from the remote");
            self.sync.reload_project().await;
            self.sync.refresh_branches().await;
            self.sync.refresh_status().await;
            return true;
        }

        if let Err(err) = vcs.create_branch(&path, &dev, &BranchName::main()).await {
            warn!(%err, "creating dev failed");
            self.sync
                .notify(Notification::error("Could not create dev branch", err.to_string()));
            return false;
        }
        if let Err(err) = vcs.checkout(&path, &dev).await {
            warn!(%err, "checking out dev failed");
            self.sync
                .notify(Notification::error("Could not switch to dev", err.to_string()));
            return false;
        }
        info!("created dev branch");

        self.sync.refresh_status().await;
        let published = !self.sync.state().has_remote() || self.sync.push_waiting().await;
        self.sync.refresh_branches().await;
        published
    }

    /// Publish: fast-forward `main` to `dev`.
    ///
    /// On failure `dev` is checked out again before the error is reported.
    /// On success `main` is pushed (with a remote), `dev` is checked out
    /// again and everything derived from the branches is refreshed. A
    /// refused push of `main` returns `false` without the success notice.
    #[instrument(skip_all)]
    pub async fn merge_dev_into_main(&self) -> bool {
        let Some(path) = self.sync.path() else {
            return false;
        };
        let vcs = self.sync.provider();
        let (main, dev) = (BranchName::main(), BranchName::dev());

        if let Err(err) = vcs.checkout(&path, &main).await {
            self.sync
                .notify(Notification::error("Publish failed", err.to_string()));
            self.sync.refresh_status().await;
            return false;
        }

        if let Err(err) = vcs.merge(&path, &dev, true).await {
            warn!(%err, "fast-forward of main failed, returning to dev");
            if let Err(rollback) = vcs.checkout(&path, &dev).await {
                warn!(%rollback, "returning to dev failed");
            }
            self.sync.refresh_status().await;
            self.sync
                .notify(Notification::error("Publish failed", err.to_string()));
            return false;
        }

        self.sync.refresh_status().await;
        let pushed = !self.sync.state().has_remote() || self.sync.push_waiting().await;

        if let Err(err) = vcs.checkout(&path, &dev).await {
            warn!(%err, "returning to dev after publish failed");
        }
        self.sync.reload_project().await;
        self.sync.refresh_branches().await;
        self.sync.refresh_status().await;
        self.refresh_branch_diff().await;

        if !pushed {
            warn!("main was merged locally but not pushed");
            return false;
        }
        self.sync.notify(Notification::success(
            "Published",
            "dev has been merged into main",
        ));
        true
    }

    /// Recount commits between `dev` and `main`.
    ///
    /// Leaves the cached value alone if `dev` does not exist or a count fails.
    pub async fn refresh_branch_diff(&self) -> Option<BranchDiff> {
        let Some(path) = self.sync.path() else {
            return self.branch_diff();
        };
        if !self.sync.state().has_local_branch(&BranchName::dev()) {
            return self.branch_diff();
        }

        let vcs = self.sync.provider();
        let (main, dev) = (BranchName::main(), BranchName::dev());
        let counts = async {
            let dev_ahead_of_main = vcs.rev_list_count(&path, main.as_str(), dev.as_str()).await?;
            let main_ahead_of_dev = vcs.rev_list_count(&path, dev.as_str(), main.as_str()).await?;
            Ok::<_, crate::git::VcsError>(BranchDiff {
                dev_ahead_of_main,
                main_ahead_of_dev,
            })
        };

        match counts.await {
            Ok(diff) => {
                self.cache().branch_diff = Some(diff);
                Some(diff)
            }
            Err(err) => {
                debug!(%err, "branch diff failed");
                self.branch_diff()
            }
        }
    }

    /// Ask the domain layer for the record-level diff of `dev` against `main`.
    ///
    /// Only meaningful while on `dev`; otherwise the cache is returned as is.
    pub async fn refresh_branch_delta(&self) -> Option<BranchDelta> {
        if !self.sync.state().is_on(&BranchName::dev()) {
            return self.branch_delta();
        }

        self.cache().loading_delta += 1;
        let result = self
            .sync
            .project()
            .branch_delta(&BranchName::main(), &BranchName::dev())
            .await;

        let mut cache = self.cache();
        cache.loading_delta -= 1;
        match result {
            Ok(delta) => cache.branch_delta = Some(delta),
            Err(err) => debug!(%err, "branch delta failed"),
        }
        cache.branch_delta.clone()
    }

    // =========================================================================
    // Releases
    // =========================================================================

    /// Reload releases from the host. Keeps the cached list on failure.
    pub async fn load_releases(&self) -> Vec<Release> {
        let Some(host) = &self.releases else {
            return Vec::new();
        };
        match host.list_releases().await {
            Ok(releases) => {
                self.cache().releases = releases.clone();
                releases
            }
            Err(err) => {
                debug!(%err, "loading releases failed");
                self.releases()
            }
        }
    }

    /// Create a release of `main` and prepend it to the cached list.
    pub async fn create_release(
        &self,
        tag_name: &str,
        name: &str,
        body: &str,
    ) -> Option<Release> {
        let Some(host) = &self.releases else {
            self.sync.notify(Notification::error(
                "Releases unavailable",
                "The remote is not hosted on a supported forge.",
            ));
            return None;
        };

        let request = CreateReleaseRequest {
            tag_name: tag_name.to_string(),
            name: name.to_string(),
            body: body.to_string(),
            target: BranchName::main().to_string(),
        };
        match host.create_release(request).await {
            Ok(release) => {
                self.cache().releases.insert(0, release.clone());
                self.sync.notify(Notification::success(
                    "Release created",
                    format!("{} is published", release.tag_name),
                ));
                Some(release)
            }
            Err(err) => {
                warn!(%err, "creating release failed");
                self.sync
                    .notify(Notification::error("Release failed", err.to_string()));
                None
            }
        }
    }

    /// The tag that follows the most recent cached release.
    pub fn next_release_version(&self, bump: VersionBump) -> ReleaseTag {
        let cache = self.cache();
        next_release_version(cache.releases.first().map(|r| r.tag_name.as_str()), bump)
    }
}

/// The tag that follows `latest`.
///
/// `v1.0` when there is no release, the latest tag is not `v<major>.<minor>`
/// or the bumped component would overflow.
///
/// ```
/// use reposync::core::types::VersionBump;
/// use reposync::workflow::next_release_version;
///
/// assert_eq!(next_release_version(Some("v2.3"), VersionBump::Minor).to_string(), "v2.4");
/// assert_eq!(next_release_version(Some("v2.3"), VersionBump::Major).to_string(), "v3.0");
/// assert_eq!(next_release_version(None, VersionBump::Minor).to_string(), "v1.0");
/// assert_eq!(next_release_version(Some("release-7"), VersionBump::Minor).to_string(), "v1.0");
/// ```
pub fn next_release_version(latest: Option<&str>, bump: VersionBump) -> ReleaseTag {
    latest
        .and_then(ReleaseTag::parse)
        .and_then(|tag| tag.bump(bump))
        .unwrap_or(ReleaseTag::INITIAL)
}
