//! git::interface
//!
//! Production [`VersionControlProvider`] backed by git2 and the git CLI.
//!
//! # Architecture
//!
//! Reads (status, branches, ancestry counts, log, conflict state) go through
//! `git2` on a blocking thread. Commands that talk to the remote or rewrite
//! the working tree (fetch, pull, push, checkout, merge, merge --abort) shell
//! out to `git` so that credential helpers, SSH configuration and hooks
//! behave exactly as they do for the user.
//!
//! The repository is opened per call; `git2::Repository` is not `Sync` and
//! the working copy may change between calls anyway.
//!
//! # Example
//!
//! ```ignore
//! use reposync::git::{Git, VersionControlProvider};
//! use std::path::{Path, PathBuf};
//!
//! let git = Git::new("origin");
//! let status = git.status(Path::new(".")).await?;
//! println!("{} ahead, {} behind", status.ahead, status.behind);
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::provider::{
    BranchInfo, BranchListing, CommitInfo, RepoStatus, VcsError, VersionControlProvider,
};
use crate::core::types::{BranchName, UtcTimestamp};

/// Git provider for a working copy.
#[derive(Debug, Clone)]
pub struct Git {
    /// Remote used for fetch/pull/push
    remote: String,
}

impl Default for Git {
    fn default() -> Self {
        Self::new("origin")
    }
}

impl Git {
    /// Create a provider that talks to the named remote.
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
        }
    }

    /// The remote name this provider uses.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Run a git CLI command in `path`, classifying failures.
    async fn run(&self, path: &Path, args: &[&str]) -> Result<String, VcsError> {
        debug!(?args, path = %path.display(), "git");
        let output = Command::new("git")
            .current_dir(path)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|e| VcsError::Other(format!("failed to run git: {e}")))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            // merge/pull print some refusals on stdout
            if stderr.trim().is_empty() {
                stderr = String::from_utf8_lossy(&output.stdout).into_owned();
            }
            debug!(?args, %stderr, "git failed");
            Err(VcsError::classify(&stderr))
        }
    }

    /// Run a git2 read on a blocking thread.
    async fn read<T, F>(&self, path: &Path, f: F) -> Result<T, VcsError>
    where
        T: Send + 'static,
        F: FnOnce(&git2::Repository) -> Result<T, VcsError> + Send + 'static,
    {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let repo = open(&path)?;
            f(&repo)
        })
        .await
        .map_err(|e| VcsError::Other(format!("git worker failed: {e}")))?
    }
}

/// Root of the working copy containing `path`.
pub fn discover_workdir(path: &Path) -> Result<PathBuf, VcsError> {
    let repo = open(path)?;
    repo.workdir()
        .map(Path::to_path_buf)
        .ok_or_else(|| VcsError::NotARepo(path.to_path_buf()))
}

fn open(path: &Path) -> Result<git2::Repository, VcsError> {
    let repo = git2::Repository::discover(path)
        .map_err(|_| VcsError::NotARepo(path.to_path_buf()))?;
    if repo.is_bare() {
        return Err(VcsError::Other("bare repository not supported".to_string()));
    }
    Ok(repo)
}

/// URL of the preferred remote, falling back to the first configured one.
fn remote_url(repo: &git2::Repository, preferred: &str) -> Result<Option<String>, VcsError> {
    if let Ok(remote) = repo.find_remote(preferred) {
        return Ok(remote.url().map(str::to_string));
    }
    let names = repo.remotes()?;
    match names.iter().flatten().next() {
        Some(name) => Ok(repo.find_remote(name)?.url().map(str::to_string)),
        None => Ok(None),
    }
}

fn commit_info(commit: &git2::Commit<'_>) -> CommitInfo {
    let hash = commit.id().to_string();
    let author = commit.author();
    let timestamp = chrono::DateTime::from_timestamp(commit.time().seconds(), 0)
        .map(UtcTimestamp::from_datetime)
        .unwrap_or_else(UtcTimestamp::now);
    CommitInfo {
        short_hash: hash.chars().take(8).collect(),
        hash,
        message: commit.message().unwrap_or_default().trim().to_string(),
        author: author.name().unwrap_or_default().to_string(),
        email: author.email().unwrap_or_default().to_string(),
        timestamp,
    }
}

#[derive(Default)]
struct FileLists {
    untracked: Vec<String>,
    modified: Vec<String>,
    staged: Vec<String>,
}

fn file_lists(repo: &git2::Repository) -> Result<FileLists, VcsError> {
    let mut opts = git2::StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);

    let mut lists = FileLists::default();
    for entry in repo.statuses(Some(&mut opts))?.iter() {
        let Some(path) = entry.path().map(str::to_string) else {
            continue;
        };
        let status = entry.status();
        if status.is_wt_new() {
            lists.untracked.push(path.clone());
        }
        if status.is_wt_modified()
            || status.is_wt_deleted()
            || status.is_wt_renamed()
            || status.is_wt_typechange()
            || status.is_conflicted()
        {
            lists.modified.push(path.clone());
        }
        if status.is_index_new()
            || status.is_index_modified()
            || status.is_index_deleted()
            || status.is_index_renamed()
            || status.is_index_typechange()
        {
            lists.staged.push(path);
        }
    }
    Ok(lists)
}

fn read_status(repo: &git2::Repository, preferred_remote: &str) -> Result<RepoStatus, VcsError> {
    let lists = file_lists(repo)?;
    let remote_url = remote_url(repo, preferred_remote)?;

    let head = match repo.head() {
        Ok(head) => Some(head),
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
        Err(e) => return Err(e.into()),
    };

    let mut branch = String::new();
    let mut ahead = 0;
    let mut behind = 0;
    let mut last_commit = None;

    if let Some(head) = head {
        let commit = head.peel_to_commit().ok();
        if head.is_branch() {
            branch = head.shorthand().unwrap_or_default().to_string();
            let local = git2::Branch::wrap(head);
            if let (Ok(upstream), Some(commit)) = (local.upstream(), commit.as_ref()) {
                if let Some(upstream_oid) = upstream.get().target() {
                    (ahead, behind) = repo.graph_ahead_behind(commit.id(), upstream_oid)?;
                }
            }
        } else if let Some(commit) = commit.as_ref() {
            branch = commit.id().to_string().chars().take(8).collect();
        }
        last_commit = commit.as_ref().map(commit_info);
    } else if let Ok(reference) = repo.find_reference("HEAD") {
        // unborn: HEAD still names the branch to be created
        if let Some(target) = reference.symbolic_target() {
            branch = target.trim_start_matches("refs/heads/").to_string();
        }
    }

    Ok(RepoStatus {
        branch,
        is_clean: lists.untracked.is_empty()
            && lists.modified.is_empty()
            && lists.staged.is_empty(),
        uncommitted_changes: lists.modified.len() + lists.staged.len(),
        untracked_files: lists.untracked,
        modified_files: lists.modified,
        staged_files: lists.staged,
        ahead,
        behind,
        remote_url,
        last_commit,
    })
}

fn resolve_commit<'r>(repo: &'r git2::Repository, spec: &str) -> Result<git2::Commit<'r>, VcsError> {
    repo.revparse_single(spec)
        .and_then(|obj| obj.peel_to_commit())
        .map_err(|e| VcsError::Other(format!("cannot resolve '{spec}': {}", e.message())))
}

#[async_trait]
impl VersionControlProvider for Git {
    fn name(&self) -> &'static str {
        "git"
    }

    fn remote_name(&self) -> &str {
        &self.remote
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn status(&self, path: &Path) -> Result<RepoStatus, VcsError> {
        let remote = self.remote.clone();
        self.read(path, move |repo| read_status(repo, &remote)).await
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn fetch(&self, path: &Path) -> Result<(), VcsError> {
        self.run(path, &["fetch", "--prune", self.remote.as_str()]).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn pull(&self, path: &Path, ff_only: bool) -> Result<(), VcsError> {
        let mode = if ff_only { "--ff-only" } else { "--no-rebase" };
        self.run(path, &["pull", mode]).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn push(&self, path: &Path) -> Result<(), VcsError> {
        self.run(path, &["push", "--set-upstream", self.remote.as_str(), "HEAD"])
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn checkout(&self, path: &Path, branch: &BranchName) -> Result<(), VcsError> {
        self.run(path, &["checkout", branch.as_str()]).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn create_branch(
        &self,
        path: &Path,
        name: &BranchName,
        base: &BranchName,
    ) -> Result<(), VcsError> {
        let name = name.clone();
        let base = base.clone();
        self.read(path, move |repo| {
            let target = resolve_commit(repo, base.as_str())?;
            repo.branch(name.as_str(), &target, false)?;
            Ok(())
        })
        .await
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn checkout_tracking(&self, path: &Path, name: &BranchName) -> Result<(), VcsError> {
        let upstream = format!("{}/{}", self.remote, name);
        self.run(path, &["checkout", "-b", name.as_str(), "--track", &upstream])
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn merge(
        &self,
        path: &Path,
        branch: &BranchName,
        ff_only: bool,
    ) -> Result<(), VcsError> {
        let mode = if ff_only { "--ff-only" } else { "--no-edit" };
        self.run(path, &["merge", mode, branch.as_str()]).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn list_branches(&self, path: &Path) -> Result<BranchListing, VcsError> {
        self.read(path, |repo| {
            let mut listing = BranchListing::default();
            for item in repo.branches(None)? {
                let (branch, kind) = item?;
                let Some(name) = branch.name().ok().flatten() else {
                    continue;
                };
                // origin/HEAD is a symbolic alias, not a branch
                if name.ends_with("/HEAD") {
                    continue;
                }
                let Ok(name) = BranchName::new(name) else {
                    continue;
                };
                let is_current = branch.is_head();
                if is_current {
                    listing.current_branch = Some(name.clone());
                }
                listing.branches.push(BranchInfo {
                    name,
                    is_current,
                    is_remote: kind == git2::BranchType::Remote,
                });
            }
            Ok(listing)
        })
        .await
    }

    async fn dirty_state(&self, path: &Path) -> Result<bool, VcsError> {
        self.read(path, |repo| {
            let lists = file_lists(repo)?;
            Ok(!(lists.untracked.is_empty() && lists.modified.is_empty() && lists.staged.is_empty()))
        })
        .await
    }

    async fn has_merge_conflict(&self, path: &Path) -> Result<bool, VcsError> {
        self.read(path, |repo| {
            if repo.state() == git2::RepositoryState::Merge {
                return Ok(true);
            }
            Ok(repo.index()?.has_conflicts())
        })
        .await
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn abort_merge(&self, path: &Path) -> Result<(), VcsError> {
        self.run(path, &["merge", "--abort"]).await?;
        Ok(())
    }

    async fn rev_list_count(&self, path: &Path, from: &str, to: &str) -> Result<usize, VcsError> {
        let from = from.to_string();
        let to = to.to_string();
        self.read(path, move |repo| {
            let base = resolve_commit(repo, &from)?.id();
            let tip = resolve_commit(repo, &to)?.id();
            let mut walk = repo.revwalk()?;
            walk.push(tip)?;
            walk.hide(base)?;
            Ok(walk.count())
        })
        .await
    }

    async fn log(&self, path: &Path, count: usize) -> Result<Vec<CommitInfo>, VcsError> {
        self.read(path, move |repo| {
            let mut walk = repo.revwalk()?;
            if walk.push_head().is_err() {
                // unborn branch: no history yet
                return Ok(Vec::new());
            }
            walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
            walk.take(count)
                .map(|oid| -> Result<CommitInfo, VcsError> {
                    Ok(commit_info(&repo.find_commit(oid?)?))
                })
                .collect()
        })
        .await
    }
}
