//! Shared fixtures for coordinator-level tests.

#![allow(dead_code)]

use std::sync::Arc;

use reposync::git::mock::MockVcs;
use reposync::project::mock::MockProject;
use reposync::sync::{RecordingNotifier, SyncCoordinator};

pub const REMOTE: &str = "git@github.com:lab/review.git";

/// A coordinator wired to recording mocks.
pub struct Harness {
    pub sync: Arc<SyncCoordinator>,
    pub vcs: MockVcs,
    pub project: MockProject,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    /// Coordinator over `vcs`, state populated, recorded calls cleared.
    pub async fn new(vcs: MockVcs) -> Self {
        let project = MockProject::new();
        let notifier = Arc::new(RecordingNotifier::new());
        let sync = SyncCoordinator::new(
            "review",
            "/projects/review",
            Arc::new(vcs.clone()),
            Arc::new(project.clone()),
            notifier.clone(),
        );
        sync.initialize().await;
        vcs.clear_operations();
        Self {
            sync,
            vcs,
            project,
            notifier,
        }
    }

    /// Working copy with a remote and the given counts.
    pub async fn with_remote(ahead: usize, behind: usize) -> Self {
        let vcs = MockVcs::new().with_remote(REMOTE);
        vcs.set_counts(ahead, behind);
        Self::new(vcs).await
    }

    /// Purely local working copy.
    pub async fn local() -> Self {
        Self::new(MockVcs::new()).await
    }
}
