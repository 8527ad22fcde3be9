//! Project set reconciliation and per-project updates

use crate::error::{Result, SyncError};
use crate::synchronizer::SyncPass;
use replica_core::{
    diff_collections, Checksum, ChecksumCollection, CompilationOptions, DocumentKind,
    ParseOptions, ProjectAttributes, ProjectChecksums, ProjectId,
};
use replica_snapshot::{ProjectState, Solution};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Baseline projects whose checksum is not part of the target
type OldProjects = BTreeMap<ProjectId, (Arc<ProjectState>, ProjectChecksums)>;

/// Target projects whose checksum is not part of the baseline
type NewProjects = BTreeMap<ProjectId, ProjectChecksums>;

impl<'a> SyncPass<'a> {
    pub(crate) async fn update_projects(
        &mut self,
        mut solution: Solution,
        old: &ChecksumCollection,
        new: &ChecksumCollection,
    ) -> Result<Solution> {
        self.check_cancelled()?;

        let sync = self.sync;
        let (old_map, added_checksums) = {
            let diff = diff_collections(sync.pool(), old.members(), new.members());
            let old_map: OldProjects = solution
                .projects()
                .filter(|p| diff.removed_only.contains(&p.checksums().checksum))
                .map(|p| (p.id(), (p.clone(), p.checksums().clone())))
                .collect();
            (old_map, diff.added_only.iter().copied().collect::<Vec<_>>())
        };
        let new_map = self.new_project_map(&added_checksums).await?;

        // One bulk fetch covers the whole tree of every added project
        let added: Vec<Checksum> = new_map
            .iter()
            .filter(|(id, _)| !old_map.contains_key(id))
            .map(|(_, tree)| tree.checksum)
            .collect();
        self.provider()
            .synchronize_projects(&added, self.cancel)
            .await?;

        // Changed projects lose their project references until they are
        // updated, so old and new reference sets never coexist
        for id in new_map.keys().filter(|id| old_map.contains_key(id)) {
            let has_references = solution
                .project(*id)
                .is_some_and(|p| !p.project_references().is_empty());
            if has_references {
                solution = solution.with_project_references(*id, Vec::new())?;
            }
        }

        for id in old_map.keys().filter(|id| !new_map.contains_key(id)) {
            debug!(project = %id, "removing project");
            solution = solution.remove_project(*id)?;
            self.report.projects_removed.push(*id);
        }

        let materializer = sync.materializer();
        for (id, tree) in new_map.iter().filter(|(id, _)| !old_map.contains_key(id)) {
            self.check_cancelled()?;
            match materializer.project_info(tree.checksum, self.cancel).await? {
                Some(info) => {
                    debug!(project = %id, name = %info.attributes.name, "adding project");
                    self.report.documents_added += DocumentKind::ALL
                        .iter()
                        .map(|kind| tree.documents_of(*kind).len())
                        .sum::<usize>();
                    solution = solution.add_project(info)?;
                    self.report.projects_added.push(*id);
                }
                None => {
                    let skipped = sync.skipped_project(tree.checksum)?;
                    sync.warn_skipped(&skipped);
                    self.report.skipped_projects.push(skipped);
                }
            }
        }

        for (id, new_tree) in &new_map {
            let Some((old_state, old_tree)) = old_map.get(id) else {
                continue;
            };
            debug_assert_ne!(old_tree.checksum, new_tree.checksum);
            solution = self
                .update_project(solution, old_state, old_tree, new_tree)
                .await?;
            self.report.projects_updated.push(*id);
        }

        Ok(solution)
    }

    /// Fetch the target-only project nodes and key them by project id
    async fn new_project_map(&self, checksums: &[Checksum]) -> Result<NewProjects> {
        let provider = self.provider();
        let trees = provider
            .get_many::<ProjectChecksums>(checksums.iter().copied(), self.cancel)
            .await?;
        provider
            .prefetch(trees.iter().map(|(_, tree)| tree.attributes), self.cancel)
            .await?;

        let mut map = NewProjects::new();
        for (_, tree) in trees {
            let attributes = provider.get_cached::<ProjectAttributes>(tree.attributes)?;
            if map.insert(attributes.id, tree).is_some() {
                return Err(SyncError::protocol(format!(
                    "project {} appears twice in the target",
                    attributes.id
                )));
            }
        }
        Ok(map)
    }

    async fn update_project(
        &mut self,
        mut solution: Solution,
        old_state: &ProjectState,
        old: &ProjectChecksums,
        new: &ProjectChecksums,
    ) -> Result<Solution> {
        self.check_cancelled()?;
        let id = old_state.id();
        let provider = self.provider();

        // Every changed value of this project in one round trip
        let mut wanted = Vec::new();
        for (before, after) in [
            (old.attributes, new.attributes),
            (old.compilation_options, new.compilation_options),
            (old.parse_options, new.parse_options),
        ] {
            if before != after {
                wanted.push(after);
            }
        }
        for (before, after) in [
            (&old.project_references, &new.project_references),
            (&old.metadata_references, &new.metadata_references),
            (&old.analyzer_references, &new.analyzer_references),
        ] {
            if before.checksum() != after.checksum() {
                wanted.extend_from_slice(after.members());
            }
        }
        provider.prefetch(wanted, self.cancel).await?;

        if old.attributes != new.attributes {
            let attributes = provider.get_cached::<ProjectAttributes>(new.attributes)?;
            check_project_identity(old_state.attributes(), &attributes)?;
            solution = solution.with_project_attributes(id, attributes)?;
        }
        if old.compilation_options != new.compilation_options {
            let options = provider.get_cached::<CompilationOptions>(new.compilation_options)?;
            solution = solution.with_compilation_options(id, options)?;
        }
        if old.parse_options != new.parse_options {
            let options = provider.get_cached::<ParseOptions>(new.parse_options)?;
            solution = solution.with_parse_options(id, options)?;
        }

        let materializer = self.sync.materializer();
        // Project references were stripped above and are always restored
        if old.project_references.checksum() != new.project_references.checksum() {
            let references = materializer.project_references(&new.project_references)?;
            solution = solution.with_project_references(id, references)?;
        } else if !old_state.project_references().is_empty() {
            solution = solution.with_project_references_from(id, old_state)?;
        }
        if old.metadata_references.checksum() != new.metadata_references.checksum() {
            let references = materializer.metadata_references(&new.metadata_references)?;
            solution = solution.with_metadata_references(id, references)?;
        }
        if old.analyzer_references.checksum() != new.analyzer_references.checksum() {
            let references = materializer.analyzer_references(&new.analyzer_references)?;
            solution = solution.with_project_analyzer_references(id, references)?;
        }

        let mut plans = Vec::new();
        for kind in DocumentKind::ALL {
            let (before, after) = (old.documents_of(kind), new.documents_of(kind));
            if before.checksum() != after.checksum() {
                plans.push(self.plan_documents(&solution, id, kind, before, after).await?);
            }
        }
        if !plans.is_empty() {
            solution = self.update_documents(solution, id, plans).await?;
        }

        debug!(project = %id, "updated project");
        Ok(solution)
    }
}

fn check_project_identity(current: &ProjectAttributes, next: &ProjectAttributes) -> Result<()> {
    let changed = if current.id != next.id {
        Some("id")
    } else if current.language != next.language {
        Some("language")
    } else if current.is_submission != next.is_submission {
        Some("is_submission")
    } else {
        None
    };

    match changed {
        Some(field) => Err(SyncError::protocol(format!(
            "project {} changed immutable field '{}'",
            current.id, field
        ))),
        None => Ok(()),
    }
}
