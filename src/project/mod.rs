//! project
//!
//! Domain-level data behind a working copy.
//!
//! # Design
//!
//! The sync layer knows nothing about records or workflow stages. When the
//! files on disk change underneath the project (a pull, a branch switch, a
//! publish) it tells the domain layer through [`ProjectDataProvider`], and
//! when a view wants a record-level comparison between branches it asks the
//! same trait for a [`BranchDelta`].
//!
//! Two implementations ship with the crate: [`DetachedProject`] for working
//! copies with no domain layer attached (the CLI), and [`mock::MockProject`]
//! for tests.

pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::BranchName;
use crate::git::RepoStatus;

/// Errors from the domain layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProjectError {
    /// No domain layer is attached to this working copy.
    #[error("project data unavailable: {0}")]
    Unavailable(String),

    /// The domain layer reported a failure.
    #[error("project operation failed: {0}")]
    Failed(String),
}

/// Record counts that differ in one workflow stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDelta {
    /// Workflow stage name (`md_imported`, `rev_included`, ...)
    pub stage: String,
    pub new: usize,
    pub changed: usize,
    pub removed: usize,
}

/// Record-level difference of `dev` relative to `main`.
///
/// Informational only; it never feeds back into sync state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchDelta {
    pub new_records: usize,
    pub changed_records: usize,
    pub removed_records: usize,
    pub by_stage: Vec<StageDelta>,
}

impl BranchDelta {
    /// Whether the branches hold the same records.
    pub fn is_empty(&self) -> bool {
        self.new_records == 0 && self.changed_records == 0 && self.removed_records == 0
    }
}

/// Domain operations the sync layer triggers.
#[async_trait]
pub trait ProjectDataProvider: Send + Sync {
    /// Mirror a fresh git status into the domain layer.
    async fn refresh_git_status(&self, status: &RepoStatus) -> Result<(), ProjectError>;

    /// Reload all project data from disk, e.g. after the checked-out branch changed.
    async fn load_project(&self, project_id: &str) -> Result<(), ProjectError>;

    /// Record-level diff of `head` against `base`.
    async fn branch_delta(
        &self,
        base: &BranchName,
        head: &BranchName,
    ) -> Result<BranchDelta, ProjectError>;
}

/// A working copy with no domain layer attached.
///
/// Status mirroring and reloads succeed without doing anything; branch
/// deltas are unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedProject;

#[async_trait]
impl ProjectDataProvider for DetachedProject {
    async fn refresh_git_status(&self, _status: &RepoStatus) -> Result<(), ProjectError> {
        Ok(())
    }

    async fn load_project(&self, _project_id: &str) -> Result<(), ProjectError> {
        Ok(())
    }

    async fn branch_delta(
        &self,
        _base: &BranchName,
        _head: &BranchName,
    ) -> Result<BranchDelta, ProjectError> {
        Err(ProjectError::Unavailable(
            "no project data provider attached".to_string(),
        ))
    }
}
