//! reposync - keep a shared project repository in sync
//!
//! reposync keeps a local working copy consistent with a shared remote while
//! serializing the mutating actions an editing client runs against it. It
//! reconciles three concerns that have no central authority: background
//! polling of the remote, user-triggered operations that must not run
//! against stale or diverging state, and a two-branch (dev/main) publishing
//! workflow with release tagging.
//!
//! # Architecture
//!
//! - [`git`] - Version-control primitives behind a single trait
//! - [`project`] - Domain-level data behind a working copy
//! - [`forge`] - Release hosting on remote forges (GitHub)
//! - [`sync`] - Sync state, the coordinator and its background poller
//! - [`workflow`] - The dev/main publishing model and releases
//! - [`guard`] - Runs mutating operations against an up-to-date copy
//! - [`core`] - Domain types and configuration
//! - [`cli`] / [`ui`] / [`logging`] - The `reposync` binary
//!
//! # Correctness Invariants
//!
//! 1. Only the sync coordinator fetches, pulls or pushes
//! 2. Status fields are written as a unit from one provider round trip
//! 3. A guarded operation either runs against a copy that is neither behind
//!    nor diverged, or does not run at all
//! 4. Nothing pulls while there are unpushed commits or uncommitted changes

pub mod cli;
pub mod core;
pub mod forge;
pub mod git;
pub mod guard;
pub mod logging;
pub mod project;
pub mod sync;
pub mod ui;
pub mod workflow;
