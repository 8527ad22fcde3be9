//! Post-synchronization checksum validation

use crate::error::{Result, SyncError};
use crate::synchronizer::{build_solution, SyncPass};
use replica_core::{Checksum, ProjectId};
use replica_snapshot::Solution;
use tracing::{debug, warn};

impl SyncPass<'_> {
    /// Compare the rebuilt tree with the requested checksum
    ///
    /// On mismatch the solution is rebuilt from scratch. If that build
    /// matches it replaces the incremental result; if it does not, the
    /// store and this process disagree and the call fails.
    pub(crate) async fn validate(
        &mut self,
        solution: Solution,
        target: Checksum,
    ) -> Result<Solution> {
        if !self.sync.config().validate.is_enabled() {
            return Ok(solution);
        }
        if self.report.is_partial() {
            // Skipped projects make the target unreachable by construction
            debug!(
                skipped = self.report.skipped_projects.len(),
                "not validating partial solution"
            );
            return Ok(solution);
        }

        self.report.validated = true;
        let actual = solution.checksum();
        if actual == target {
            return Ok(solution);
        }

        warn!(
            expected = %target.short(),
            actual = %actual.short(),
            "incremental result does not match target, rebuilding from scratch"
        );
        let build = self.sync.collect_solution(target, self.cancel).await?;
        let partial = !build.skipped.is_empty();
        let rebuilt = build_solution(build)?;
        let rebuilt_checksum = rebuilt.checksum();
        if partial || rebuilt_checksum != target {
            return Err(SyncError::ConsistencyFailure {
                expected: target,
                actual: rebuilt_checksum,
            });
        }

        let diverged = diverging_projects(&solution, &rebuilt);
        warn!(
            projects = ?diverged,
            "incremental synchronization diverged, using from-scratch build"
        );
        self.report.used_fallback = true;
        Ok(rebuilt)
    }
}

/// Projects whose checksums differ between two versions of a solution
pub fn diverging_projects(left: &Solution, right: &Solution) -> Vec<ProjectId> {
    let mut ids: Vec<ProjectId> = left
        .projects()
        .filter(|p| match right.project(p.id()) {
            Some(other) => other.checksums().checksum != p.checksums().checksum,
            None => true,
        })
        .map(|p| p.id())
        .collect();
    ids.extend(right.project_ids().filter(|id| !left.contains_project(*id)));
    ids
}
