//! Document set reconciliation, generic over the three document kinds

use crate::error::{Result, SyncError};
use crate::synchronizer::SyncPass;
use replica_core::{
    diff_collections, Checksum, ChecksumCollection, DocumentAttributes, DocumentChecksums,
    DocumentId, DocumentKind, ProjectId, SourceText,
};
use replica_snapshot::{DocumentInfo, SnapshotError, Solution};
use std::collections::BTreeMap;
use tracing::debug;

type DocumentMap = BTreeMap<DocumentId, DocumentChecksums>;

/// Changed documents of one kind within one project
pub(crate) struct DocumentPlan {
    kind: DocumentKind,
    old_map: DocumentMap,
    new_map: DocumentMap,
}

impl DocumentPlan {
    fn removed(&self) -> Vec<DocumentId> {
        self.old_map
            .keys()
            .filter(|id| !self.new_map.contains_key(id))
            .copied()
            .collect()
    }
}

impl<'a> SyncPass<'a> {
    /// Diff one kind's collection against the current project state.
    /// Must run before any document of the project is touched.
    pub(crate) async fn plan_documents(
        &self,
        solution: &Solution,
        project: ProjectId,
        kind: DocumentKind,
        old: &ChecksumCollection,
        new: &ChecksumCollection,
    ) -> Result<DocumentPlan> {
        self.check_cancelled()?;

        let (old_map, added_checksums) = {
            let diff = diff_collections(self.sync.pool(), old.members(), new.members());
            let state = solution
                .project(project)
                .ok_or(SnapshotError::UnknownProject { id: project })?;
            let old_map: DocumentMap = state
                .documents(kind)
                .values()
                .filter(|d| diff.removed_only.contains(&d.checksums().checksum))
                .map(|d| (d.id(), d.checksums().clone()))
                .collect();
            (old_map, diff.added_only.iter().copied().collect::<Vec<_>>())
        };
        let new_map = self.new_document_map(&added_checksums).await?;

        Ok(DocumentPlan {
            kind,
            old_map,
            new_map,
        })
    }

    /// Reconcile the changed document kinds of one project.
    ///
    /// Removals of every kind go first: a document moving between kinds
    /// keeps its id, and ids are unique across kinds.
    pub(crate) async fn update_documents(
        &mut self,
        mut solution: Solution,
        project: ProjectId,
        plans: Vec<DocumentPlan>,
    ) -> Result<Solution> {
        for plan in &plans {
            let removed = plan.removed();
            if !removed.is_empty() {
                debug!(
                    project = %project,
                    kind = ?plan.kind,
                    count = removed.len(),
                    "removing documents"
                );
                self.report.documents_removed += removed.len();
                solution = solution.remove_documents(project, plan.kind, &removed)?;
            }
        }

        for plan in &plans {
            solution = self
                .add_and_update_documents(solution, project, plan)
                .await?;
        }
        Ok(solution)
    }

    async fn add_and_update_documents(
        &mut self,
        mut solution: Solution,
        project: ProjectId,
        plan: &DocumentPlan,
    ) -> Result<Solution> {
        self.check_cancelled()?;

        let sync = self.sync;
        let DocumentPlan { kind, old_map, new_map } = plan;

        // Many changes: one bulk fetch. A few: fetch each on its own.
        if new_map.len() > sync.config().bulk_document_threshold {
            let checksums: Vec<Checksum> = new_map.values().map(|d| d.checksum).collect();
            self.provider()
                .synchronize_documents(&checksums, self.cancel)
                .await?;
        }

        let materializer = sync.materializer();
        let mut added = Vec::new();
        for (_, tree) in new_map.iter().filter(|(id, _)| !old_map.contains_key(id)) {
            added.push(materializer.document_info(tree.checksum, self.cancel).await?);
        }
        if !added.is_empty() {
            debug!(project = %project, ?kind, count = added.len(), "adding documents");
            self.report.documents_added += added.len();
            solution = solution.add_documents(project, *kind, added)?;
        }

        for (id, new_tree) in new_map {
            let Some(old_tree) = old_map.get(id) else {
                continue;
            };
            debug_assert_ne!(old_tree.checksum, new_tree.checksum);
            solution = self
                .update_document(solution, project, *id, old_tree, new_tree)
                .await?;
            self.report.documents_updated += 1;
        }

        Ok(solution)
    }

    /// Fetch the target-only document nodes and key them by document id
    async fn new_document_map(&self, checksums: &[Checksum]) -> Result<DocumentMap> {
        let provider = self.provider();
        let trees = provider
            .get_many::<DocumentChecksums>(checksums.iter().copied(), self.cancel)
            .await?;
        provider
            .prefetch(trees.iter().map(|(_, tree)| tree.attributes), self.cancel)
            .await?;

        let mut map = DocumentMap::new();
        for (_, tree) in trees {
            let attributes = provider.get_cached::<DocumentAttributes>(tree.attributes)?;
            if map.insert(attributes.id, tree).is_some() {
                return Err(SyncError::protocol(format!(
                    "document {} appears twice in one collection",
                    attributes.id
                )));
            }
        }
        Ok(map)
    }

    async fn update_document(
        &mut self,
        mut solution: Solution,
        project: ProjectId,
        id: DocumentId,
        old: &DocumentChecksums,
        new: &DocumentChecksums,
    ) -> Result<Solution> {
        self.check_cancelled()?;
        let provider = self.provider();

        if old.attributes != new.attributes {
            let next: DocumentAttributes = provider.get(new.attributes, self.cancel).await?;
            let (kind, current) = {
                let document = solution
                    .document(project, id)
                    .ok_or(SnapshotError::UnknownDocument { project, id })?;
                (document.kind(), document.attributes().clone())
            };
            check_document_identity(&current, &next)?;

            // Only ordinary documents take folder and source kind edits in
            // place; any other kind gets its node rebuilt
            if kind != DocumentKind::Document
                && (current.folders != next.folders || current.source_kind != next.source_kind)
            {
                let text: SourceText = provider.get(new.text, self.cancel).await?;
                debug!(project = %project, document = %id, ?kind, "rebuilding document");
                return Ok(solution
                    .remove_documents(project, kind, &[id])?
                    .add_documents(project, kind, vec![DocumentInfo::new(next, text)])?);
            }

            if current.folders != next.folders {
                solution = solution.with_document_folders(project, id, next.folders)?;
            }
            if current.source_kind != next.source_kind {
                solution = solution.with_document_source_kind(project, id, next.source_kind)?;
            }
        }

        if old.text != new.text {
            let text: SourceText = provider.get(new.text, self.cancel).await?;
            solution = solution.with_document_text(project, id, text)?;
        }

        Ok(solution)
    }
}

fn check_document_identity(current: &DocumentAttributes, next: &DocumentAttributes) -> Result<()> {
    let changed = if current.id != next.id {
        Some("id")
    } else if current.name != next.name {
        Some("name")
    } else if current.file_path != next.file_path {
        Some("file_path")
    } else if current.is_generated != next.is_generated {
        Some("is_generated")
    } else if current.design_time_only != next.design_time_only {
        Some("design_time_only")
    } else {
        None
    };

    match changed {
        Some(field) => Err(SyncError::protocol(format!(
            "document {} changed immutable field '{}'",
            current.id, field
        ))),
        None => Ok(()),
    }
}
