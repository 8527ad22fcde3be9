//! What a synchronization did

use replica_core::{Checksum, FetchStats, ProjectId};
use replica_snapshot::Solution;
use serde::Serialize;

/// A project present in the target that could not be materialized here
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedProject {
    pub id: ProjectId,
    pub name: String,
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub baseline: Checksum,
    pub target: Checksum,
    /// Baseline already matched the target; nothing was fetched
    pub up_to_date: bool,
    pub projects_added: Vec<ProjectId>,
    pub projects_removed: Vec<ProjectId>,
    pub projects_updated: Vec<ProjectId>,
    pub documents_added: usize,
    pub documents_removed: usize,
    pub documents_updated: usize,
    pub skipped_projects: Vec<SkippedProject>,
    pub validated: bool,
    /// Incremental result failed validation and was replaced by a from-scratch build
    pub used_fallback: bool,
    pub fetch: FetchStats,
}

impl SyncReport {
    pub(crate) fn new(baseline: Checksum, target: Checksum) -> Self {
        Self {
            baseline,
            target,
            ..Self::default()
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.skipped_projects.is_empty()
    }

    pub fn changed_projects(&self) -> usize {
        self.projects_added.len() + self.projects_removed.len() + self.projects_updated.len()
    }
}

/// Result of [`crate::Synchronizer::synchronize_with_report`]
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub solution: Solution,
    pub report: SyncReport,
}
