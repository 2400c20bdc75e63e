//! sync::state
//!
//! The in-memory model of a working copy's remote-relative state.

use serde::Serialize;

use crate::core::types::{BranchName, UtcTimestamp};
use crate::git::{BranchInfo, CommitInfo, RepoStatus};

/// Remote-relative state of one open project.
///
/// Owned by [`SyncCoordinator`](super::SyncCoordinator); everyone else sees
/// cloned snapshots. The status fields (`current_branch`, `ahead`, `behind`,
/// `is_clean`, `uncommitted_changes`, `remote_url`, `last_commit`) are only
/// written together, from a single provider round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncState {
    /// Checked-out branch, or a short hash when HEAD is detached
    pub current_branch: String,
    pub branches: Vec<BranchInfo>,
    pub ahead: usize,
    pub behind: usize,
    pub is_clean: bool,
    pub uncommitted_changes: usize,
    /// `None` for a purely local project
    pub remote_url: Option<String>,
    pub last_commit: Option<CommitInfo>,
    pub has_merge_conflict: bool,
    /// Last fetch failed because the remote was unreachable
    pub is_offline: bool,
    /// Push automatically after a guarded operation
    pub auto_save: bool,
    pub last_fetch_time: Option<UtcTimestamp>,
}

impl SyncState {
    /// Empty state carrying the auto-save preference.
    pub fn new(auto_save: bool) -> Self {
        Self {
            auto_save,
            ..Self::default()
        }
    }

    /// Write the status fields as a unit.
    pub(crate) fn apply_status(&mut self, status: &RepoStatus) {
        self.current_branch = status.branch.clone();
        self.ahead = status.ahead;
        self.behind = status.behind;
        self.is_clean = status.is_clean;
        self.uncommitted_changes = status.uncommitted_changes;
        self.remote_url = status.remote_url.clone();
        self.last_commit = status.last_commit.clone();
    }

    pub fn has_remote(&self) -> bool {
        self.remote_url.is_some()
    }

    /// Both sides have commits the other lacks.
    pub fn is_diverged(&self) -> bool {
        self.ahead > 0 && self.behind > 0
    }

    /// A fast-forward pull would bring in commits.
    pub fn can_pull(&self) -> bool {
        self.behind > 0 && self.ahead == 0
    }

    pub fn can_push(&self) -> bool {
        self.ahead > 0 && !self.is_diverged()
    }

    /// Whether the background poller may pull without asking.
    pub fn is_safe_to_auto_pull(&self) -> bool {
        self.has_remote() && self.can_pull() && self.is_clean
    }

    /// Whether a local (non-remote) branch of this name is known.
    pub fn has_local_branch(&self, name: &BranchName) -> bool {
        self.branches
            .iter()
            .any(|b| !b.is_remote && &b.name == name)
    }

    /// Whether `remote` has a branch of this name among the remote-tracking branches.
    pub fn has_remote_branch(&self, remote: &str, name: &BranchName) -> bool {
        self.branches.iter().any(|b| {
            b.is_remote
                && b.name
                    .as_str()
                    .strip_prefix(remote)
                    .and_then(|rest| rest.strip_prefix('/'))
                    == Some(name.as_str())
        })
    }

    pub fn is_on(&self, name: &BranchName) -> bool {
        self.current_branch == name.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(ahead: usize, behind: usize) -> SyncState {
        SyncState {
            ahead,
            behind,
            is_clean: true,
            remote_url: Some("git@github.com:o/r.git".into()),
            ..Default::default()
        }
    }

    #[test]
    fn derived_predicates() {
        let synced = state(0, 0);
        assert!(!synced.is_diverged() && !synced.can_pull() && !synced.can_push());

        let behind = state(0, 3);
        assert!(behind.can_pull() && !behind.can_push());
        assert!(behind.is_safe_to_auto_pull());

        let ahead = state(2, 0);
        assert!(ahead.can_push() && !ahead.can_pull());

        let diverged = state(2, 3);
        assert!(diverged.is_diverged());
        assert!(!diverged.can_pull() && !diverged.can_push());
        assert!(!diverged.is_safe_to_auto_pull());
    }

    #[test]
    fn remote_branch_lookup_is_per_remote() {
        let branch = |name: &str, is_remote| BranchInfo {
            name: BranchName::new(name).unwrap(),
            is_current: false,
            is_remote,
        };
        let state = SyncState {
            branches: vec![
                branch("main", false),
                branch("origin/dev", true),
                branch("upstream/feature/dev", true),
            ],
            ..Default::default()
        };

        assert!(state.has_remote_branch("origin", &BranchName::dev()));
        assert!(!state.has_remote_branch("upstream", &BranchName::dev()));
        assert!(!state.has_remote_branch("origin", &BranchName::main()));
        assert!(!state.has_local_branch(&BranchName::dev()));
    }

    #[test]
    fn dirty_or_local_never_auto_pulls() {
        let mut dirty = state(0, 1);
        dirty.is_clean = false;
        assert!(!dirty.is_safe_to_auto_pull());

        let mut local = state(0, 1);
        local.remote_url = None;
        assert!(!local.has_remote());
        assert!(!local.is_safe_to_auto_pull());
    }

    #[test]
    fn apply_status_writes_every_status_field() {
        let mut sync = SyncState::new(true);
        sync.apply_status(&RepoStatus {
            branch: "dev".into(),
            is_clean: false,
            uncommitted_changes: 2,
            ahead: 1,
            behind: 4,
            remote_url: Some("https://github.com/o/r".into()),
            ..Default::default()
        });
        assert!(sync.is_on(&BranchName::dev()));
        assert_eq!((sync.ahead, sync.behind), (1, 4));
        assert!(!sync.is_clean);
        assert_eq!(sync.uncommitted_changes, 2);
        assert!(sync.auto_save);
    }
}
