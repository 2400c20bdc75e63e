//! git
//!
//! Version-control primitives behind a single trait.
//!
//! # Architecture
//!
//! The sync layer never talks to git directly. It holds an
//! `Arc<dyn VersionControlProvider>` and works with the typed results in
//! [`provider`]. Two implementations ship with the crate:
//!
//! - [`Git`]: the production provider. Local reads (status, branches, log,
//!   commit counts) go through `git2`; commands that touch the network or
//!   rewrite the worktree (fetch, pull, push, checkout, merge) run the `git`
//!   CLI so credential helpers and hooks behave as they do for the user.
//! - [`mock::MockVcs`]: an in-memory provider that records every call.
//!
//! # Invariants
//!
//! - Raw git output is classified into [`VcsError`] inside the provider; no
//!   caller matches on error strings.
//! - `status` is a single round trip, so its fields are mutually consistent.
//!
//! # Example
//!
//! ```no_run
//! use reposync::git::{Git, VersionControlProvider};
//! use std::path::Path;
//!
//! # async fn demo() -> Result<(), reposync::git::VcsError> {
//! let git = Git::new("origin");
//! let status = git.status(Path::new(".")).await?;
//! println!("{} (+{} -{})", status.branch, status.ahead, status.behind);
//! # Ok(())
//! # }
//! ```

mod interface;
pub mod mock;
mod provider;

pub use interface::{discover_workdir, Git};
pub use provider::{
    BranchInfo, BranchListing, CommitInfo, RepoStatus, VcsError, VersionControlProvider,
};
