//! sync
//!
//! Keeps a local working copy consistent with its remote.
//!
//! # Components
//!
//! - [`SyncState`]: branch, ahead/behind, cleanliness, remote, conflict and
//!   offline flags, plus derived predicates
//! - [`SyncCoordinator`]: the only component that fetches, pulls or pushes;
//!   owns the state and the background poller
//! - [`Notifier`]: where user-facing outcomes go
//!
//! One coordinator exists per open project. It is created when the project
//! is opened and [`close`](SyncCoordinator::close)d when it is closed.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use reposync::git::Git;
//! use reposync::project::DetachedProject;
//! use reposync::sync::{SilentNotifier, SyncCoordinator};
//!
//! # async fn demo() {
//! let sync = SyncCoordinator::new(
//!     "review",
//!     "/path/to/project",
//!     Arc::new(Git::default()),
//!     Arc::new(DetachedProject),
//!     Arc::new(SilentNotifier),
//! );
//! sync.initialize().await;
//! sync.start_background_fetch(Duration::from_secs(60));
//! # }
//! ```

mod coordinator;
mod notify;
mod poller;
mod state;

pub use coordinator::{OperationPermit, SyncCoordinator};
pub use notify::{Level, Notification, Notifier, RecordingNotifier, SilentNotifier};
pub use state::SyncState;
