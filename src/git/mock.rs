//! git::mock
//!
//! In-memory version-control provider for deterministic testing.
//!
//! # Design
//!
//! `MockVcs` models just enough of a working copy to drive the sync layer:
//! the checked-out branch, local/remote branches, ahead/behind counts,
//! cleanliness, the remote URL and merge state. Every call is recorded so
//! tests can assert on exactly which primitives ran and in what order.
//! Failures are injected per operation kind, and any operation can be held
//! open with [`MockVcs::hold`] to exercise interleavings.
//!
//! # Example
//!
//! ```
//! use reposync::git::mock::{MockVcs, OpKind};
//! use reposync::git::{VcsError, VersionControlProvider};
//! use std::path::Path;
//!
//! # tokio_test::block_on(async {
//! let vcs = MockVcs::new().with_remote("https://github.com/o/r.git");
//! vcs.set_counts(0, 3);
//! vcs.fail(OpKind::Pull, VcsError::Diverged);
//!
//! assert_eq!(vcs.pull(Path::new("/p"), true).await, Err(VcsError::Diverged));
//! assert_eq!(vcs.count(OpKind::Pull), 1);
//! # });
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::provider::{
    BranchInfo, BranchListing, CommitInfo, RepoStatus, VcsError, VersionControlProvider,
};
use crate::core::types::BranchName;

/// Kind of provider call, for failure injection and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Status,
    Fetch,
    Pull,
    Push,
    Checkout,
    CheckoutTracking,
    CreateBranch,
    Merge,
    ListBranches,
    DirtyState,
    HasMergeConflict,
    AbortMerge,
    RevListCount,
    Log,
}

/// Recorded call for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Status,
    Fetch,
    Pull { ff_only: bool },
    Push { branch: String },
    Checkout { branch: String },
    CheckoutTracking { branch: String },
    CreateBranch { name: String, base: String },
    Merge { branch: String, ff_only: bool },
    ListBranches,
    DirtyState,
    HasMergeConflict,
    AbortMerge,
    RevListCount { from: String, to: String },
    Log { count: usize },
}

impl MockOperation {
    /// The kind of this operation.
    pub fn kind(&self) -> OpKind {
        match self {
            MockOperation::Status => OpKind::Status,
            MockOperation::Fetch => OpKind::Fetch,
            MockOperation::Pull { .. } => OpKind::Pull,
            MockOperation::Push { .. } => OpKind::Push,
            MockOperation::Checkout { .. } => OpKind::Checkout,
            MockOperation::CheckoutTracking { .. } => OpKind::CheckoutTracking,
            MockOperation::CreateBranch { .. } => OpKind::CreateBranch,
            MockOperation::Merge { .. } => OpKind::Merge,
            MockOperation::ListBranches => OpKind::ListBranches,
            MockOperation::DirtyState => OpKind::DirtyState,
            MockOperation::HasMergeConflict => OpKind::HasMergeConflict,
            MockOperation::AbortMerge => OpKind::AbortMerge,
            MockOperation::RevListCount { .. } => OpKind::RevListCount,
            MockOperation::Log { .. } => OpKind::Log,
        }
    }
}

/// Mock provider. Clones share state.
#[derive(Debug, Clone)]
pub struct MockVcs {
    inner: Arc<Mutex<MockVcsInner>>,
}

#[derive(Debug)]
struct MockVcsInner {
    current: String,
    local: BTreeSet<String>,
    remote_branches: BTreeSet<String>,
    ahead: usize,
    behind: usize,
    /// Remote commits that the next fetch will reveal as `behind`
    incoming: usize,
    is_clean: bool,
    remote_url: Option<String>,
    merge_conflict: bool,
    rev_counts: HashMap<(String, String), usize>,
    commits: Vec<CommitInfo>,
    failures: HashMap<OpKind, VcsError>,
    holds: HashMap<OpKind, Arc<Notify>>,
    operations: Vec<MockOperation>,
}

impl Default for MockVcs {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVcs {
    /// A clean, local-only working copy on `main`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockVcsInner {
                current: "main".to_string(),
                local: BTreeSet::from(["main".to_string()]),
                remote_branches: BTreeSet::new(),
                ahead: 0,
                behind: 0,
                incoming: 0,
                is_clean: true,
                remote_url: None,
                merge_conflict: false,
                rev_counts: HashMap::new(),
                commits: Vec::new(),
                failures: HashMap::new(),
                holds: HashMap::new(),
                operations: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockVcsInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Configure a remote URL (builder style).
    pub fn with_remote(self, url: &str) -> Self {
        {
            let mut inner = self.lock();
            inner.remote_url = Some(url.to_string());
            let remote_main = "origin/main".to_string();
            inner.remote_branches.insert(remote_main);
        }
        self
    }

    /// Add a branch that only exists on the remote (builder style).
    pub fn with_remote_branch(self, name: &str) -> Self {
        self.lock().remote_branches.insert(format!("origin/{name}"));
        self
    }

    /// Add a local branch (builder style).
    pub fn with_branch(self, name: &str) -> Self {
        self.lock().local.insert(name.to_string());
        self
    }

    /// Set the ahead/behind counts.
    pub fn set_counts(&self, ahead: usize, behind: usize) {
        let mut inner = self.lock();
        inner.ahead = ahead;
        inner.behind = behind;
    }

    /// Commits the next successful fetch will reveal.
    pub fn set_incoming(&self, count: usize) {
        self.lock().incoming = count;
    }

    /// Mark the working tree clean or dirty.
    pub fn set_clean(&self, clean: bool) {
        self.lock().is_clean = clean;
    }

    /// Set the merge-in-progress flag.
    pub fn set_merge_conflict(&self, conflict: bool) {
        self.lock().merge_conflict = conflict;
    }

    /// Switch the checked-out branch without recording a call.
    pub fn set_current(&self, branch: &str) {
        let mut inner = self.lock();
        inner.local.insert(branch.to_string());
        inner.current = branch.to_string();
    }

    /// Set the result of `rev_list_count(from, to)`.
    pub fn set_rev_count(&self, from: &str, to: &str, count: usize) {
        self.lock()
            .rev_counts
            .insert((from.to_string(), to.to_string()), count);
    }

    /// Set the commits returned by `log`.
    pub fn set_commits(&self, commits: Vec<CommitInfo>) {
        self.lock().commits = commits;
    }

    /// Make every call of `kind` fail with `error` until cleared.
    pub fn fail(&self, kind: OpKind, error: VcsError) {
        self.lock().failures.insert(kind, error);
    }

    /// Stop injecting failures for `kind`.
    pub fn clear_failure(&self, kind: OpKind) {
        self.lock().failures.remove(&kind);
    }

    /// Hold every call of `kind` until the returned gate is notified.
    ///
    /// The call is recorded before it blocks.
    pub fn hold(&self, kind: OpKind) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().holds.insert(kind, Arc::clone(&gate));
        gate
    }

    /// Stop holding calls of `kind`.
    pub fn release(&self, kind: OpKind) {
        if let Some(gate) = self.lock().holds.remove(&kind) {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    /// The checked-out branch.
    pub fn current_branch(&self) -> String {
        self.lock().current.clone()
    }

    /// All recorded operations, in call order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Recorded operations excluding read-only queries.
    pub fn mutations(&self) -> Vec<MockOperation> {
        self.operations()
            .into_iter()
            .filter(|op| {
                !matches!(
                    op.kind(),
                    OpKind::Status
                        | OpKind::ListBranches
                        | OpKind::DirtyState
                        | OpKind::HasMergeConflict
                        | OpKind::RevListCount
                        | OpKind::Log
                )
            })
            .collect()
    }

    /// Number of recorded calls of `kind`.
    pub fn count(&self, kind: OpKind) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|op| op.kind() == kind)
            .count()
    }

    /// Forget recorded operations.
    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    /// Record a call, wait on its hold gate if any, then report injected failure.
    async fn enter(&self, op: MockOperation) -> Result<(), VcsError> {
        let kind = op.kind();
        let gate = {
            let mut inner = self.lock();
            inner.operations.push(op);
            inner.holds.get(&kind).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.lock().failures.get(&kind) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VersionControlProvider for MockVcs {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn remote_name(&self) -> &str {
        "origin"
    }

    async fn status(&self, _path: &Path) -> Result<RepoStatus, VcsError> {
        self.enter(MockOperation::Status).await?;
        let inner = self.lock();
        let (modified, untracked) = if inner.is_clean {
            (Vec::new(), Vec::new())
        } else {
            (vec!["records.bib".to_string()], Vec::new())
        };
        Ok(RepoStatus {
            branch: inner.current.clone(),
            is_clean: inner.is_clean,
            uncommitted_changes: modified.len(),
            untracked_files: untracked,
            modified_files: modified,
            staged_files: Vec::new(),
            ahead: inner.ahead,
            behind: inner.behind,
            remote_url: inner.remote_url.clone(),
            last_commit: inner.commits.first().cloned(),
        })
    }

    async fn fetch(&self, _path: &Path) -> Result<(), VcsError> {
        self.enter(MockOperation::Fetch).await?;
        let mut inner = self.lock();
        if inner.remote_url.is_none() {
            return Err(VcsError::Other("no remote configured".to_string()));
        }
        inner.behind += inner.incoming;
        inner.incoming = 0;
        Ok(())
    }

    async fn pull(&self, _path: &Path, ff_only: bool) -> Result<(), VcsError> {
        self.enter(MockOperation::Pull { ff_only }).await?;
        let mut inner = self.lock();
        if ff_only && inner.ahead > 0 && inner.behind > 0 {
            return Err(VcsError::Diverged);
        }
        inner.behind = 0;
        Ok(())
    }

    async fn push(&self, _path: &Path) -> Result<(), VcsError> {
        let branch = self.current_branch();
        self.enter(MockOperation::Push {
            branch: branch.clone(),
        })
        .await?;
        let mut inner = self.lock();
        if inner.behind > 0 {
            return Err(VcsError::Diverged);
        }
        inner.ahead = 0;
        inner.remote_branches.insert(format!("origin/{branch}"));
        Ok(())
    }

    async fn checkout(&self, _path: &Path, branch: &BranchName) -> Result<(), VcsError> {
        self.enter(MockOperation::Checkout {
            branch: branch.to_string(),
        })
        .await?;
        let mut inner = self.lock();
        if !inner.local.contains(branch.as_str()) {
            return Err(VcsError::Other(format!(
                "pathspec '{branch}' did not match any file(s) known to git"
            )));
        }
        inner.current = branch.to_string();
        Ok(())
    }

    async fn checkout_tracking(&self, _path: &Path, name: &BranchName) -> Result<(), VcsError> {
        self.enter(MockOperation::CheckoutTracking {
            branch: name.to_string(),
        })
        .await?;
        let mut inner = self.lock();
        if !inner.remote_branches.contains(&format!("origin/{name}")) {
            return Err(VcsError::Other(format!(
                "'origin/{name}' is not a branch"
            )));
        }
        if !inner.local.insert(name.to_string()) {
            return Err(VcsError::Other(format!(
                "a branch named '{name}' already exists"
            )));
        }
        inner.current = name.to_string();
        inner.ahead = 0;
        inner.behind = 0;
        Ok(())
    }

    async fn create_branch(
        &self,
        _path: &Path,
        name: &BranchName,
        base: &BranchName,
    ) -> Result<(), VcsError> {
        self.enter(MockOperation::CreateBranch {
            name: name.to_string(),
            base: base.to_string(),
        })
        .await?;
        let mut inner = self.lock();
        if !inner.local.contains(base.as_str()) {
            return Err(VcsError::Other(format!("not a valid object name: '{base}'")));
        }
        if !inner.local.insert(name.to_string()) {
            return Err(VcsError::Other(format!(
                "a branch named '{name}' already exists"
            )));
        }
        Ok(())
    }

    async fn merge(
        &self,
        _path: &Path,
        branch: &BranchName,
        ff_only: bool,
    ) -> Result<(), VcsError> {
        self.enter(MockOperation::Merge {
            branch: branch.to_string(),
            ff_only,
        })
        .await
    }

    async fn list_branches(&self, _path: &Path) -> Result<BranchListing, VcsError> {
        self.enter(MockOperation::ListBranches).await?;
        let inner = self.lock();
        let mut branches = Vec::new();
        for name in &inner.local {
            branches.push(BranchInfo {
                name: BranchName::new(name.as_str())
                    .map_err(|e| VcsError::Other(e.to_string()))?,
                is_current: *name == inner.current,
                is_remote: false,
            });
        }
        for name in &inner.remote_branches {
            branches.push(BranchInfo {
                name: BranchName::new(name.as_str())
                    .map_err(|e| VcsError::Other(e.to_string()))?,
                is_current: false,
                is_remote: true,
            });
        }
        Ok(BranchListing {
            branches,
            current_branch: BranchName::new(inner.current.as_str()).ok(),
        })
    }

    async fn dirty_state(&self, _path: &Path) -> Result<bool, VcsError> {
        self.enter(MockOperation::DirtyState).await?;
        Ok(!self.lock().is_clean)
    }

    async fn has_merge_conflict(&self, _path: &Path) -> Result<bool, VcsError> {
        self.enter(MockOperation::HasMergeConflict).await?;
        Ok(self.lock().merge_conflict)
    }

    async fn abort_merge(&self, _path: &Path) -> Result<(), VcsError> {
        self.enter(MockOperation::AbortMerge).await?;
        self.lock().merge_conflict = false;
        Ok(())
    }

    async fn rev_list_count(&self, _path: &Path, from: &str, to: &str) -> Result<usize, VcsError> {
        self.enter(MockOperation::RevListCount {
            from: from.to_string(),
            to: to.to_string(),
        })
        .await?;
        Ok(self
            .lock()
            .rev_counts
            .get(&(from.to_string(), to.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn log(&self, _path: &Path, count: usize) -> Result<Vec<CommitInfo>, VcsError> {
        self.enter(MockOperation::Log { count }).await?;
        Ok(self.lock().commits.iter().take(count).cloned().collect())
    }
}
