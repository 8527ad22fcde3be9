//! Live solution: root of the persistent snapshot tree
//!
//! Every operation returns a new `Solution`. Only the path from the changed
//! node to the root is rebuilt; all other projects, documents and reference
//! lists are shared with the previous version by `Arc`. Readers holding an
//! older `Solution` keep seeing exactly what they saw before.

use crate::document::DocumentState;
use crate::error::{Result, SnapshotError};
use crate::info::{DocumentInfo, ProjectInfo, SolutionInfo};
use crate::project::ProjectState;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use replica_core::{
    AnalyzerReference, AssetValue, Checksum, ChecksumCollection, CollectionKind,
    CompilationOptions, DocumentId, DocumentKind, FrozenDocumentIdentity, MetadataReference,
    ParseOptions, ProjectAttributes, ProjectId, ProjectReference, SolutionAttributes, SolutionId,
    SolutionChecksums, SourceKind, SourceText,
};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

/// A provisional generated document overlaid on a solution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenDocument {
    pub identity: FrozenDocumentIdentity,
    pub text: SourceText,
}

#[derive(Debug)]
struct SolutionState {
    attributes: Arc<SolutionAttributes>,
    projects: Arc<BTreeMap<ProjectId, Arc<ProjectState>>>,
    analyzer_references: Arc<Vec<Arc<AnalyzerReference>>>,
    frozen_document: Option<Arc<FrozenDocument>>,
    checksums: OnceLock<SolutionChecksums>,
}

/// Immutable, cheaply clonable snapshot of a whole solution
#[derive(Debug, Clone)]
pub struct Solution {
    state: Arc<SolutionState>,
}

impl Solution {
    /// Solution with no projects
    pub fn empty(attributes: SolutionAttributes) -> Self {
        Self::from_parts(
            Arc::new(attributes),
            Arc::new(BTreeMap::new()),
            Arc::new(Vec::new()),
            None,
        )
    }

    /// Build a complete solution from a description
    pub fn from_info(info: SolutionInfo) -> Result<Self> {
        let mut projects = BTreeMap::new();
        for project in info.projects {
            let id = project.attributes.id;
            let state = ProjectState::new(project)?;
            if projects.insert(id, Arc::new(state)).is_some() {
                return Err(SnapshotError::DuplicateProject { id });
            }
        }
        check_acyclic(&projects)?;

        Ok(Self::from_parts(
            Arc::new(info.attributes),
            Arc::new(projects),
            Arc::new(info.analyzer_references),
            None,
        ))
    }

    fn from_parts(
        attributes: Arc<SolutionAttributes>,
        projects: Arc<BTreeMap<ProjectId, Arc<ProjectState>>>,
        analyzer_references: Arc<Vec<Arc<AnalyzerReference>>>,
        frozen_document: Option<Arc<FrozenDocument>>,
    ) -> Self {
        Self {
            state: Arc::new(SolutionState {
                attributes,
                projects,
                analyzer_references,
                frozen_document,
                checksums: OnceLock::new(),
            }),
        }
    }

    fn with_projects(&self, projects: BTreeMap<ProjectId, Arc<ProjectState>>) -> Self {
        Self::from_parts(
            self.state.attributes.clone(),
            Arc::new(projects),
            self.state.analyzer_references.clone(),
            self.state.frozen_document.clone(),
        )
    }

    /// Whether two handles point at the very same snapshot
    pub fn ptr_eq(&self, other: &Solution) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub fn id(&self) -> SolutionId {
        self.state.attributes.id
    }

    pub fn file_path(&self) -> Option<&str> {
        self.state.attributes.file_path.as_deref()
    }

    pub fn attributes(&self) -> &SolutionAttributes {
        &self.state.attributes
    }

    pub fn analyzer_references(&self) -> &[Arc<AnalyzerReference>] {
        &self.state.analyzer_references
    }

    pub fn projects(&self) -> impl Iterator<Item = &Arc<ProjectState>> + '_ {
        self.state.projects.values()
    }

    pub fn project_ids(&self) -> impl Iterator<Item = ProjectId> + '_ {
        self.state.projects.keys().copied()
    }

    pub fn project_count(&self) -> usize {
        self.state.projects.len()
    }

    pub fn project(&self, id: ProjectId) -> Option<&Arc<ProjectState>> {
        self.state.projects.get(&id)
    }

    pub fn contains_project(&self, id: ProjectId) -> bool {
        self.state.projects.contains_key(&id)
    }

    pub fn document(&self, project: ProjectId, id: DocumentId) -> Option<&Arc<DocumentState>> {
        self.project(project).and_then(|p| p.document(id))
    }

    pub fn frozen_document(&self) -> Option<&FrozenDocument> {
        self.state.frozen_document.as_deref()
    }

    /// Checksum tree root for this snapshot (memoized)
    pub fn checksums(&self) -> &SolutionChecksums {
        self.state.checksums.get_or_init(|| {
            let state = &self.state;
            SolutionChecksums::new(
                state.attributes.checksum(),
                ChecksumCollection::new(
                    CollectionKind::Projects,
                    state.projects.values().map(|p| p.checksums().checksum),
                ),
                ChecksumCollection::new(
                    CollectionKind::AnalyzerReferences,
                    state.analyzer_references.iter().map(|r| r.checksum()),
                ),
                state
                    .frozen_document
                    .as_ref()
                    .map(|f| (f.identity.checksum(), f.text.checksum())),
            )
        })
    }

    pub fn checksum(&self) -> Checksum {
        self.checksums().checksum
    }

    /// Back to a description that can recreate this snapshot (minus any frozen document)
    pub fn to_info(&self) -> SolutionInfo {
        SolutionInfo {
            attributes: (*self.state.attributes).clone(),
            projects: self.projects().map(|p| p.to_info()).collect(),
            analyzer_references: (*self.state.analyzer_references).clone(),
        }
    }

    pub fn with_attributes(&self, attributes: SolutionAttributes) -> Result<Self> {
        if attributes.id != self.id() {
            return Err(SnapshotError::ImmutableField {
                node: "solution",
                field: "id",
            });
        }
        Ok(Self::from_parts(
            Arc::new(attributes),
            self.state.projects.clone(),
            self.state.analyzer_references.clone(),
            self.state.frozen_document.clone(),
        ))
    }

    /// Replace the solution-level analyzer references wholesale
    pub fn with_analyzer_references(&self, references: Vec<Arc<AnalyzerReference>>) -> Self {
        Self::from_parts(
            self.state.attributes.clone(),
            self.state.projects.clone(),
            Arc::new(references),
            self.state.frozen_document.clone(),
        )
    }

    pub fn add_project(&self, info: ProjectInfo) -> Result<Self> {
        let id = info.attributes.id;
        if self.contains_project(id) {
            return Err(SnapshotError::DuplicateProject { id });
        }

        let has_references = !info.project_references.is_empty();
        let mut projects = (*self.state.projects).clone();
        projects.insert(id, Arc::new(ProjectState::new(info)?));
        if has_references {
            check_acyclic(&projects)?;
        }
        Ok(self.with_projects(projects))
    }

    /// Remove a project; references other projects hold to it are left as they are
    pub fn remove_project(&self, id: ProjectId) -> Result<Self> {
        if !self.contains_project(id) {
            return Err(SnapshotError::UnknownProject { id });
        }

        let mut projects = (*self.state.projects).clone();
        projects.remove(&id);

        let frozen = self
            .state
            .frozen_document
            .clone()
            .filter(|f| f.identity.project_id != id);
        Ok(Self::from_parts(
            self.state.attributes.clone(),
            Arc::new(projects),
            self.state.analyzer_references.clone(),
            frozen,
        ))
    }

    fn update_project(
        &self,
        id: ProjectId,
        update: impl FnOnce(&ProjectState) -> Result<ProjectState>,
    ) -> Result<Self> {
        let current = self
            .project(id)
            .ok_or(SnapshotError::UnknownProject { id })?;
        let next = update(current)?;

        let mut projects = (*self.state.projects).clone();
        projects.insert(id, Arc::new(next));
        Ok(self.with_projects(projects))
    }

    pub fn with_project_attributes(
        &self,
        id: ProjectId,
        attributes: ProjectAttributes,
    ) -> Result<Self> {
        self.update_project(id, |p| p.with_attributes(attributes))
    }

    pub fn with_compilation_options(
        &self,
        id: ProjectId,
        options: CompilationOptions,
    ) -> Result<Self> {
        self.update_project(id, |p| Ok(p.with_compilation_options(options)))
    }

    pub fn with_parse_options(&self, id: ProjectId, options: ParseOptions) -> Result<Self> {
        self.update_project(id, |p| Ok(p.with_parse_options(options)))
    }

    /// Replace a project's references to other projects
    ///
    /// Fails if the new references close a cycle among the projects present.
    pub fn with_project_references(
        &self,
        id: ProjectId,
        references: Vec<ProjectReference>,
    ) -> Result<Self> {
        let check = !references.is_empty();
        let next = self.update_project(id, |p| Ok(p.with_project_references(references)))?;
        if check {
            check_acyclic(&next.state.projects)?;
        }
        Ok(next)
    }

    /// Restore a project's references from another version of the same project,
    /// sharing the list instead of copying it
    pub fn with_project_references_from(
        &self,
        id: ProjectId,
        source: &ProjectState,
    ) -> Result<Self> {
        let check = !source.project_references().is_empty();
        let next = self.update_project(id, |p| Ok(p.with_shared_project_references(source)))?;
        if check {
            check_acyclic(&next.state.projects)?;
        }
        Ok(next)
    }

    pub fn with_metadata_references(
        &self,
        id: ProjectId,
        references: Vec<Arc<MetadataReference>>,
    ) -> Result<Self> {
        self.update_project(id, |p| Ok(p.with_metadata_references(references)))
    }

    pub fn with_project_analyzer_references(
        &self,
        id: ProjectId,
        references: Vec<Arc<AnalyzerReference>>,
    ) -> Result<Self> {
        self.update_project(id, |p| Ok(p.with_analyzer_references(references)))
    }

    /// Add a batch of documents of one kind in a single rebuild
    pub fn add_documents(
        &self,
        project: ProjectId,
        kind: DocumentKind,
        documents: Vec<DocumentInfo>,
    ) -> Result<Self> {
        if documents.is_empty() {
            return Ok(self.clone());
        }
        self.update_project(project, |p| p.add_documents(kind, documents))
    }

    /// Remove a batch of documents of one kind in a single rebuild
    pub fn remove_documents(
        &self,
        project: ProjectId,
        kind: DocumentKind,
        ids: &[DocumentId],
    ) -> Result<Self> {
        if ids.is_empty() {
            return Ok(self.clone());
        }
        self.update_project(project, |p| p.remove_documents(kind, ids))
    }

    fn update_document(
        &self,
        project: ProjectId,
        id: DocumentId,
        update: impl FnOnce(&DocumentState) -> Result<DocumentState>,
    ) -> Result<Self> {
        self.update_project(project, |p| {
            let document = p
                .document(id)
                .ok_or(SnapshotError::UnknownDocument { project, id })?;
            Ok(p.with_document(update(document)?))
        })
    }

    /// Replace the whole text of a document of any kind
    pub fn with_document_text(
        &self,
        project: ProjectId,
        id: DocumentId,
        text: SourceText,
    ) -> Result<Self> {
        self.update_document(project, id, |d| Ok(d.with_text(text)))
    }

    /// Change the folders of an ordinary document
    pub fn with_document_folders(
        &self,
        project: ProjectId,
        id: DocumentId,
        folders: Vec<String>,
    ) -> Result<Self> {
        self.update_document(project, id, |d| {
            require_ordinary(d, "change folders")?;
            let mut attributes = d.attributes().clone();
            attributes.folders = folders;
            Ok(d.with_attributes(attributes))
        })
    }

    /// Change the source kind of an ordinary document
    pub fn with_document_source_kind(
        &self,
        project: ProjectId,
        id: DocumentId,
        source_kind: SourceKind,
    ) -> Result<Self> {
        self.update_document(project, id, |d| {
            require_ordinary(d, "change source kind")?;
            let mut attributes = d.attributes().clone();
            attributes.source_kind = source_kind;
            Ok(d.with_attributes(attributes))
        })
    }

    /// Attach a frozen generated document, replacing any previous one
    pub fn with_frozen_document(
        &self,
        identity: FrozenDocumentIdentity,
        text: SourceText,
    ) -> Result<Self> {
        if !self.contains_project(identity.project_id) {
            return Err(SnapshotError::UnknownProject {
                id: identity.project_id,
            });
        }
        Ok(Self::from_parts(
            self.state.attributes.clone(),
            self.state.projects.clone(),
            self.state.analyzer_references.clone(),
            Some(Arc::new(FrozenDocument { identity, text })),
        ))
    }

    /// Same snapshot without its frozen document (itself if there is none)
    pub fn without_frozen_document(&self) -> Self {
        if self.state.frozen_document.is_none() {
            return self.clone();
        }
        Self::from_parts(
            self.state.attributes.clone(),
            self.state.projects.clone(),
            self.state.analyzer_references.clone(),
            None,
        )
    }
}

fn require_ordinary(document: &DocumentState, operation: &'static str) -> Result<()> {
    if document.kind() != DocumentKind::Document {
        return Err(SnapshotError::WrongDocumentKind {
            id: document.id(),
            kind: document.kind(),
            operation,
        });
    }
    Ok(())
}

/// Reject project reference cycles among the projects present
///
/// References to projects that are not (yet) part of the solution are
/// allowed and ignored here.
fn check_acyclic(projects: &BTreeMap<ProjectId, Arc<ProjectState>>) -> Result<()> {
    let mut graph = DiGraphMap::<ProjectId, ()>::new();
    for (id, project) in projects {
        graph.add_node(*id);
        for reference in project.project_references() {
            if projects.contains_key(&reference.project_id) {
                graph.add_edge(*id, reference.project_id, ());
            }
        }
    }

    toposort(&graph, None)
        .map(|_| ())
        .map_err(|cycle| SnapshotError::CyclicReference {
            project: cycle.node_id(),
        })
}
