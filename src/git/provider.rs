//! git::provider
//!
//! The version-control contract consumed by the sync layer.
//!
//! # Design
//!
//! `VersionControlProvider` is async because every primitive may touch the
//! network or the working tree. Each method returns a structured result;
//! failures are normalized into the closed [`VcsError`] set so callers
//! dispatch on variants instead of matching error strings.
//!
//! Raw git output is classified exactly once, by [`VcsError::classify`],
//! inside the provider implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::core::types::{BranchName, UtcTimestamp};

/// Errors from version-control primitives.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VcsError {
    /// Local and remote histories have diverged; a fast-forward is impossible.
    #[error("local and remote histories have diverged")]
    Diverged,

    /// The remote could not be reached (DNS, routing, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The working tree has uncommitted changes.
    #[error("working tree has uncommitted changes")]
    DirtyWorktree,

    /// The path is not inside a git working copy.
    #[error("not a git repository: {}", .0.display())]
    NotARepo(PathBuf),

    /// Any other failure, with the underlying message.
    #[error("{0}")]
    Other(String),
}

/// Output fragments that indicate the remote was unreachable.
const NETWORK_SIGNATURES: &[&str] = &[
    "could not resolve host",
    "temporary failure in name resolution",
    "name or service not known",
    "nodename nor servname provided",
    "network is unreachable",
    "no route to host",
    "connection timed out",
    "operation timed out",
    "connection refused",
    "failed to connect to",
    "could not resolve hostname",
];

/// Output fragments that indicate a fast-forward was impossible.
const DIVERGED_SIGNATURES: &[&str] = &[
    "not possible to fast-forward",
    "diverging branches can't be fast-forwarded",
    "have diverged",
    "non-fast-forward",
];

/// Output fragments that indicate local changes block the command.
const DIRTY_SIGNATURES: &[&str] = &[
    "your local changes to the following files would be overwritten",
    "please commit your changes or stash them",
];

impl VcsError {
    /// Classify raw git stderr into a typed error.
    ///
    /// ```
    /// use reposync::git::VcsError;
    ///
    /// let err = VcsError::classify("fatal: unable to access 'https://x/': Could not resolve host: x");
    /// assert!(err.is_network());
    ///
    /// let err = VcsError::classify("fatal: Not possible to fast-forward, aborting.");
    /// assert_eq!(err, VcsError::Diverged);
    /// ```
    pub fn classify(stderr: &str) -> Self {
        let lowered = stderr.to_lowercase();
        let trimmed = stderr.trim();

        if NETWORK_SIGNATURES.iter().any(|sig| lowered.contains(sig)) {
            VcsError::Network(trimmed.to_string())
        } else if DIVERGED_SIGNATURES.iter().any(|sig| lowered.contains(sig)) {
            VcsError::Diverged
        } else if DIRTY_SIGNATURES.iter().any(|sig| lowered.contains(sig)) {
            VcsError::DirtyWorktree
        } else if trimmed.is_empty() {
            VcsError::Other("git command failed".to_string())
        } else {
            VcsError::Other(trimmed.to_string())
        }
    }

    /// Whether this error means the remote was unreachable.
    pub fn is_network(&self) -> bool {
        matches!(self, VcsError::Network(_))
    }
}

impl From<git2::Error> for VcsError {
    fn from(err: git2::Error) -> Self {
        VcsError::Other(err.message().to_string())
    }
}

/// A branch as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchInfo {
    /// Short name (`dev`, `origin/main`)
    pub name: BranchName,
    /// Whether this is the checked-out branch
    pub is_current: bool,
    /// Whether this is a remote-tracking branch
    pub is_remote: bool,
}

/// Result of listing branches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchListing {
    pub branches: Vec<BranchInfo>,
    /// `None` when HEAD is detached or unborn
    pub current_branch: Option<BranchName>,
}

impl BranchListing {
    /// Whether a local branch with this name exists.
    pub fn has_local(&self, name: &BranchName) -> bool {
        self.branches
            .iter()
            .any(|b| !b.is_remote && &b.name == name)
    }
}

/// Information about a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    pub hash: String,
    pub short_hash: String,
    /// Full commit message, trimmed
    pub message: String,
    pub author: String,
    pub email: String,
    pub timestamp: UtcTimestamp,
}

impl CommitInfo {
    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// Snapshot of working-copy status relative to its upstream.
///
/// Produced by one provider round trip so the sync layer can write the
/// remote-relative fields as a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoStatus {
    /// Checked-out branch, or the 8-character short hash when detached
    pub branch: String,
    /// No untracked, modified or staged files
    pub is_clean: bool,
    /// Modified plus staged file count
    pub uncommitted_changes: usize,
    pub untracked_files: Vec<String>,
    pub modified_files: Vec<String>,
    pub staged_files: Vec<String>,
    /// Commits the local branch has that its upstream lacks
    pub ahead: usize,
    /// Commits the upstream has that the local branch lacks
    pub behind: usize,
    /// URL of the first configured remote
    pub remote_url: Option<String>,
    pub last_commit: Option<CommitInfo>,
}

/// Git primitives against a working directory.
///
/// Implementations must be `Send + Sync`; the sync layer shares one provider
/// between the background poller and user-triggered actions.
#[async_trait]
pub trait VersionControlProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &'static str;

    /// Remote that fetch, pull and push talk to.
    fn remote_name(&self) -> &str;

    /// Branch, ahead/behind, cleanliness, remote URL and file lists.
    async fn status(&self, path: &Path) -> Result<RepoStatus, VcsError>;

    /// Fetch from the configured remote.
    async fn fetch(&self, path: &Path) -> Result<(), VcsError>;

    /// Pull the current branch. With `ff_only`, divergence yields [`VcsError::Diverged`]
    /// and the working copy is left untouched.
    async fn pull(&self, path: &Path, ff_only: bool) -> Result<(), VcsError>;

    /// Push the current branch, setting its upstream if needed.
    async fn push(&self, path: &Path) -> Result<(), VcsError>;

    /// Check out an existing branch.
    async fn checkout(&self, path: &Path, branch: &BranchName) -> Result<(), VcsError>;

    /// Create `name` at the tip of `base` without checking it out.
    async fn create_branch(
        &self,
        path: &Path,
        name: &BranchName,
        base: &BranchName,
    ) -> Result<(), VcsError>;

    /// Create `name` from the remote's branch of the same name, set it to
    /// track that branch and check it out.
    async fn checkout_tracking(&self, path: &Path, name: &BranchName) -> Result<(), VcsError>;

    /// Merge `branch` into the current branch.
    async fn merge(&self, path: &Path, branch: &BranchName, ff_only: bool)
        -> Result<(), VcsError>;

    /// List local and remote-tracking branches.
    async fn list_branches(&self, path: &Path) -> Result<BranchListing, VcsError>;

    /// Whether the working tree has uncommitted changes.
    async fn dirty_state(&self, path: &Path) -> Result<bool, VcsError>;

    /// Whether an unresolved merge is in progress.
    async fn has_merge_conflict(&self, path: &Path) -> Result<bool, VcsError>;

    /// Abort an in-progress merge.
    async fn abort_merge(&self, path: &Path) -> Result<(), VcsError>;

    /// Number of commits reachable from `to` but not from `from` (`from..to`).
    async fn rev_list_count(&self, path: &Path, from: &str, to: &str) -> Result<usize, VcsError>;

    /// The most recent `count` commits on HEAD, newest first.
    async fn log(&self, path: &Path, count: usize) -> Result<Vec<CommitInfo>, VcsError>;
}
