//! project::mock
//!
//! Recording domain layer for tests.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{BranchDelta, ProjectDataProvider, ProjectError};
use crate::core::types::BranchName;
use crate::git::RepoStatus;

/// Recorded call for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectCall {
    RefreshGitStatus { branch: String },
    LoadProject { project_id: String },
    BranchDelta { base: String, head: String },
}

/// Mock domain layer. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockProject {
    inner: Arc<Mutex<MockProjectInner>>,
}

#[derive(Debug, Default)]
struct MockProjectInner {
    delta: BranchDelta,
    delta_error: Option<ProjectError>,
    load_error: Option<ProjectError>,
    delta_gate: Option<Arc<Notify>>,
    calls: Vec<ProjectCall>,
}

impl MockProject {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockProjectInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set the delta returned by `branch_delta`.
    pub fn set_delta(&self, delta: BranchDelta) {
        self.lock().delta = delta;
    }

    /// Make `branch_delta` fail (or succeed again with `None`).
    pub fn set_delta_error(&self, error: Option<ProjectError>) {
        self.lock().delta_error = error;
    }

    /// Make `load_project` fail (or succeed again with `None`).
    pub fn set_load_error(&self, error: Option<ProjectError>) {
        self.lock().load_error = error;
    }

    /// Hold `branch_delta` calls until the returned gate is notified, once per call.
    pub fn hold_delta(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().delta_gate = Some(Arc::clone(&gate));
        gate
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<ProjectCall> {
        self.lock().calls.clone()
    }

    /// Number of full project reloads.
    pub fn reloads(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ProjectCall::LoadProject { .. }))
            .count()
    }
}

#[async_trait]
impl ProjectDataProvider for MockProject {
    async fn refresh_git_status(&self, status: &RepoStatus) -> Result<(), ProjectError> {
        self.lock().calls.push(ProjectCall::RefreshGitStatus {
            branch: status.branch.clone(),
        });
        Ok(())
    }

    async fn load_project(&self, project_id: &str) -> Result<(), ProjectError> {
        let mut inner = self.lock();
        inner.calls.push(ProjectCall::LoadProject {
            project_id: project_id.to_string(),
        });
        match &inner.load_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn branch_delta(
        &self,
        base: &BranchName,
        head: &BranchName,
    ) -> Result<BranchDelta, ProjectError> {
        let gate = {
            let mut inner = self.lock();
            inner.calls.push(ProjectCall::BranchDelta {
                base: base.to_string(),
                head: head.to_string(),
            });
            inner.delta_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let inner = self.lock();
        match &inner.delta_error {
            Some(err) => Err(err.clone()),
            None => Ok(inner.delta.clone()),
        }
    }
}
