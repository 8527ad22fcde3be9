//! Incremental reconstruction of a solution from a target checksum

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::materialize::ProjectMaterializer;
use crate::report::{SkippedProject, SyncOutcome, SyncReport};
use replica_core::{
    AssetProvider, CancellationToken, Checksum, FrozenDocumentIdentity, ProjectAttributes,
    ScratchPool, SolutionAttributes, SolutionChecksums, SourceText,
};
use replica_snapshot::{ReferenceCache, Solution, SolutionInfo};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Rebuilds solutions described by checksum trees, reusing a baseline
///
/// One synchronizer can serve many concurrent calls: the snapshot tree is
/// immutable and the provider cache is keyed by content.
pub struct Synchronizer {
    provider: Arc<AssetProvider>,
    pool: Arc<ScratchPool>,
    references: Arc<ReferenceCache>,
    config: SyncConfig,
}

/// A solution rebuilt from nothing but the store
pub(crate) struct ScratchBuild {
    pub info: SolutionInfo,
    pub frozen_document: Option<(FrozenDocumentIdentity, SourceText)>,
    pub skipped: Vec<SkippedProject>,
}

impl Synchronizer {
    pub fn new(provider: Arc<AssetProvider>, pool: Arc<ScratchPool>, config: SyncConfig) -> Self {
        Self {
            provider,
            pool,
            references: Arc::new(ReferenceCache::new()),
            config,
        }
    }

    /// Share a reference cache with other synchronizers
    pub fn with_reference_cache(mut self, references: Arc<ReferenceCache>) -> Self {
        self.references = references;
        self
    }

    pub fn provider(&self) -> &Arc<AssetProvider> {
        &self.provider
    }

    pub fn pool(&self) -> &ScratchPool {
        &self.pool
    }

    pub fn references(&self) -> &ReferenceCache {
        &self.references
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub(crate) fn materializer(&self) -> ProjectMaterializer<'_> {
        ProjectMaterializer::new(&self.provider, &self.references, &self.config)
    }

    /// Whether `target` describes the same solution lineage as `baseline`
    ///
    /// Only the solution id and file path are compared.
    pub async fn is_incremental_update(
        &self,
        baseline: &Solution,
        target: Checksum,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let tree: SolutionChecksums = self.provider.get(target, cancel).await?;
        let attributes: SolutionAttributes = self.provider.get(tree.attributes, cancel).await?;
        Ok(same_lineage(baseline, &attributes))
    }

    /// Rebuild the solution stored under `target`, starting from `baseline`
    pub async fn synchronize(
        &self,
        baseline: &Solution,
        target: Checksum,
        cancel: &CancellationToken,
    ) -> Result<Solution> {
        Ok(self
            .synchronize_with_report(baseline, target, cancel)
            .await?
            .solution)
    }

    pub async fn synchronize_with_report(
        &self,
        baseline: &Solution,
        target: Checksum,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome> {
        let before = self.provider.stats();
        let mut pass = SyncPass {
            sync: self,
            cancel,
            report: SyncReport::new(baseline.checksum(), target),
        };

        match pass.run(baseline, target).await {
            Ok(solution) => {
                let mut report = pass.report;
                report.fetch = self.provider.stats().since(&before);
                info!(
                    solution = %solution.id(),
                    target = %target.short(),
                    projects_changed = report.changed_projects(),
                    documents_added = report.documents_added,
                    documents_removed = report.documents_removed,
                    documents_updated = report.documents_updated,
                    round_trips = report.fetch.round_trips,
                    "synchronized solution"
                );
                Ok(SyncOutcome { solution, report })
            }
            Err(err) if err.is_fatal() => {
                error!(
                    solution = %baseline.id(),
                    target = %target.short(),
                    error = %err,
                    "synchronization failed"
                );
                Err(err)
            }
            Err(err) => {
                debug!(target = %target.short(), "synchronization cancelled");
                Err(err)
            }
        }
    }

    /// Description of the solution stored under `target`, built without a baseline
    ///
    /// Projects that cannot be materialized here are left out.
    pub async fn create_solution_info(
        &self,
        target: Checksum,
        cancel: &CancellationToken,
    ) -> Result<SolutionInfo> {
        Ok(self.collect_solution(target, cancel).await?.info)
    }

    /// Live solution for `target`, built without a baseline
    pub async fn create_solution(
        &self,
        target: Checksum,
        cancel: &CancellationToken,
    ) -> Result<Solution> {
        let build = self.collect_solution(target, cancel).await?;
        for skipped in &build.skipped {
            self.warn_skipped(skipped);
        }
        build_solution(build)
    }

    pub(crate) async fn collect_solution(
        &self,
        target: Checksum,
        cancel: &CancellationToken,
    ) -> Result<ScratchBuild> {
        let tree: SolutionChecksums = self.provider.get(target, cancel).await?;
        let attributes: SolutionAttributes = self.provider.get(tree.attributes, cancel).await?;

        self.provider
            .synchronize_projects(tree.projects.members(), cancel)
            .await?;

        let materializer = self.materializer();
        let mut info = SolutionInfo::new(attributes);
        let mut skipped = Vec::new();
        for checksum in tree.projects.members() {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            match materializer.project_info(*checksum, cancel).await? {
                Some(project) => info.projects.push(project),
                None => skipped.push(self.skipped_project(*checksum)?),
            }
        }
        info.analyzer_references = materializer
            .fetch_analyzer_references(&tree.analyzer_references, cancel)
            .await?;

        let frozen_document = match tree.frozen_document() {
            Some((identity, text)) => {
                Some(self.fetch_frozen_document(identity, text, cancel).await?)
            }
            None => None,
        };

        Ok(ScratchBuild {
            info,
            frozen_document,
            skipped,
        })
    }

    pub(crate) async fn fetch_frozen_document(
        &self,
        identity: Checksum,
        text: Checksum,
        cancel: &CancellationToken,
    ) -> Result<(FrozenDocumentIdentity, SourceText)> {
        self.provider.prefetch([identity, text], cancel).await?;
        Ok((
            self.provider
                .get_cached::<FrozenDocumentIdentity>(identity)?,
            self.provider.get_cached::<SourceText>(text)?,
        ))
    }

    /// Report entry for a project whose attributes are already cached
    pub(crate) fn skipped_project(&self, project_checksum: Checksum) -> Result<SkippedProject> {
        let tree = self
            .provider
            .get_cached::<replica_core::ProjectChecksums>(project_checksum)?;
        let attributes = self
            .provider
            .get_cached::<ProjectAttributes>(tree.attributes)?;
        Ok(SkippedProject {
            id: attributes.id,
            name: attributes.name,
            language: attributes.language,
        })
    }

    pub(crate) fn warn_skipped(&self, skipped: &SkippedProject) {
        if self.config.warn_on_skipped_projects {
            warn!(
                project = %skipped.id,
                name = %skipped.name,
                language = %skipped.language,
                "skipping project with unsupported language"
            );
        } else {
            debug!(
                project = %skipped.id,
                language = %skipped.language,
                "skipping unsupported project"
            );
        }
    }
}

pub(crate) fn build_solution(build: ScratchBuild) -> Result<Solution> {
    let solution = Solution::from_info(build.info)?;
    match build.frozen_document {
        Some((identity, text)) if solution.contains_project(identity.project_id) => {
            Ok(solution.with_frozen_document(identity, text)?)
        }
        _ => Ok(solution),
    }
}

fn same_lineage(baseline: &Solution, attributes: &SolutionAttributes) -> bool {
    baseline.id() == attributes.id && baseline.file_path() == attributes.file_path.as_deref()
}

/// State of one synchronization call
///
/// All tree mutation happens here, sequentially, between fetches.
pub(crate) struct SyncPass<'a> {
    pub sync: &'a Synchronizer,
    pub cancel: &'a CancellationToken,
    pub report: SyncReport,
}

impl<'a> SyncPass<'a> {
    pub fn provider(&self) -> &'a AssetProvider {
        &self.sync.provider
    }

    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }

    async fn run(&mut self, baseline: &Solution, target: Checksum) -> Result<Solution> {
        self.check_cancelled()?;
        if baseline.checksum() == target {
            self.report.up_to_date = true;
            return Ok(baseline.clone());
        }

        let mut solution = baseline.without_frozen_document();
        let old = solution.checksums().clone();
        let new: SolutionChecksums = self.provider().get(target, self.cancel).await?;

        if old.attributes != new.attributes {
            let attributes: SolutionAttributes =
                self.provider().get(new.attributes, self.cancel).await?;
            if attributes.id != solution.id() {
                return Err(SyncError::NotIncremental {
                    solution: solution.id(),
                    target,
                    reason: "solution id changed",
                });
            }
            if !same_lineage(&solution, &attributes) {
                return Err(SyncError::NotIncremental {
                    solution: solution.id(),
                    target,
                    reason: "solution file path changed",
                });
            }
            debug!(version = attributes.version, "updating solution attributes");
            solution = solution.with_attributes(attributes)?;
        }

        if old.projects.checksum() != new.projects.checksum() {
            solution = self
                .update_projects(solution, &old.projects, &new.projects)
                .await?;
        }

        if old.analyzer_references.checksum() != new.analyzer_references.checksum() {
            let references = self
                .sync
                .materializer()
                .fetch_analyzer_references(&new.analyzer_references, self.cancel)
                .await?;
            debug!(count = references.len(), "replacing solution analyzer references");
            solution = solution.with_analyzer_references(references);
        }

        if let Some((identity, text)) = new.frozen_document() {
            let (identity, text) = self
                .sync
                .fetch_frozen_document(identity, text, self.cancel)
                .await?;
            if solution.contains_project(identity.project_id) {
                solution = solution.with_frozen_document(identity, text)?;
            } else {
                warn!(
                    project = %identity.project_id,
                    document = %identity.document_id,
                    "frozen document belongs to a project that is not present, leaving it detached"
                );
            }
        }

        self.validate(solution, target).await
    }
}
