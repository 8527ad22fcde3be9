//! Live project nodes

use crate::document::DocumentState;
use crate::error::{Result, SnapshotError};
use crate::info::{DocumentInfo, ProjectInfo};
use replica_core::{
    AnalyzerReference, AssetValue, ChecksumCollection, CollectionKind, CompilationOptions,
    DocumentId, DocumentKind, MetadataReference, ParseOptions, ProjectAttributes,
    ProjectChecksums, ProjectId, ProjectReference,
};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

/// Documents of one kind, ordered by id
pub type DocumentMap = BTreeMap<DocumentId, Arc<DocumentState>>;

/// Immutable project node
///
/// Every child list sits behind its own `Arc`, so an update that touches one
/// list shares the others with the previous version of the project.
#[derive(Debug)]
pub struct ProjectState {
    attributes: Arc<ProjectAttributes>,
    compilation_options: Arc<CompilationOptions>,
    parse_options: Arc<ParseOptions>,
    project_references: Arc<Vec<ProjectReference>>,
    metadata_references: Arc<Vec<Arc<MetadataReference>>>,
    analyzer_references: Arc<Vec<Arc<AnalyzerReference>>>,
    documents: Arc<DocumentMap>,
    additional_documents: Arc<DocumentMap>,
    analyzer_config_documents: Arc<DocumentMap>,
    checksums: OnceLock<ProjectChecksums>,
}

fn document_map(
    project: ProjectId,
    kind: DocumentKind,
    infos: Vec<DocumentInfo>,
) -> Result<DocumentMap> {
    let mut map = DocumentMap::new();
    for info in infos {
        let state = DocumentState::new(kind, info);
        let id = state.id();
        if map.insert(id, Arc::new(state)).is_some() {
            return Err(SnapshotError::DuplicateDocument { project, id });
        }
    }
    Ok(map)
}

impl ProjectState {
    pub fn new(info: ProjectInfo) -> Result<Self> {
        let id = info.attributes.id;
        let mut state = Self {
            attributes: Arc::new(info.attributes),
            compilation_options: Arc::new(info.compilation_options),
            parse_options: Arc::new(info.parse_options),
            project_references: Arc::new(info.project_references),
            metadata_references: Arc::new(info.metadata_references),
            analyzer_references: Arc::new(info.analyzer_references),
            documents: Arc::new(DocumentMap::new()),
            additional_documents: Arc::new(DocumentMap::new()),
            analyzer_config_documents: Arc::new(DocumentMap::new()),
            checksums: OnceLock::new(),
        };

        for (kind, infos) in [
            (DocumentKind::Document, info.documents),
            (DocumentKind::Additional, info.additional_documents),
            (DocumentKind::AnalyzerConfig, info.analyzer_config_documents),
        ] {
            let map = document_map(id, kind, infos)?;
            for document_id in map.keys() {
                if state.contains_document(*document_id) {
                    return Err(SnapshotError::DuplicateDocument {
                        project: id,
                        id: *document_id,
                    });
                }
            }
            *state.documents_slot(kind) = Arc::new(map);
        }
        Ok(state)
    }

    /// Copy of this node with fresh (not yet computed) checksums
    fn modified(&self, change: impl FnOnce(&mut ProjectState)) -> ProjectState {
        let mut next = ProjectState {
            attributes: self.attributes.clone(),
            compilation_options: self.compilation_options.clone(),
            parse_options: self.parse_options.clone(),
            project_references: self.project_references.clone(),
            metadata_references: self.metadata_references.clone(),
            analyzer_references: self.analyzer_references.clone(),
            documents: self.documents.clone(),
            additional_documents: self.additional_documents.clone(),
            analyzer_config_documents: self.analyzer_config_documents.clone(),
            checksums: OnceLock::new(),
        };
        change(&mut next);
        next
    }

    fn documents_slot(&mut self, kind: DocumentKind) -> &mut Arc<DocumentMap> {
        match kind {
            DocumentKind::Document => &mut self.documents,
            DocumentKind::Additional => &mut self.additional_documents,
            DocumentKind::AnalyzerConfig => &mut self.analyzer_config_documents,
        }
    }

    pub fn id(&self) -> ProjectId {
        self.attributes.id
    }

    pub fn name(&self) -> &str {
        &self.attributes.name
    }

    pub fn language(&self) -> &str {
        &self.attributes.language
    }

    pub fn attributes(&self) -> &ProjectAttributes {
        &self.attributes
    }

    pub fn compilation_options(&self) -> &CompilationOptions {
        &self.compilation_options
    }

    pub fn parse_options(&self) -> &ParseOptions {
        &self.parse_options
    }

    pub fn project_references(&self) -> &[ProjectReference] {
        &self.project_references
    }

    pub fn metadata_references(&self) -> &[Arc<MetadataReference>] {
        &self.metadata_references
    }

    pub fn analyzer_references(&self) -> &[Arc<AnalyzerReference>] {
        &self.analyzer_references
    }

    pub fn documents(&self, kind: DocumentKind) -> &DocumentMap {
        match kind {
            DocumentKind::Document => &self.documents,
            DocumentKind::Additional => &self.additional_documents,
            DocumentKind::AnalyzerConfig => &self.analyzer_config_documents,
        }
    }

    /// Look a document up in any of the three collections
    pub fn document(&self, id: DocumentId) -> Option<&Arc<DocumentState>> {
        DocumentKind::ALL
            .into_iter()
            .find_map(|kind| self.documents(kind).get(&id))
    }

    pub fn contains_document(&self, id: DocumentId) -> bool {
        self.document(id).is_some()
    }

    pub fn document_count(&self) -> usize {
        DocumentKind::ALL
            .into_iter()
            .map(|kind| self.documents(kind).len())
            .sum()
    }

    pub fn checksums(&self) -> &ProjectChecksums {
        self.checksums.get_or_init(|| self.compute_checksums())
    }

    fn compute_checksums(&self) -> ProjectChecksums {
        let documents = |kind: DocumentKind| {
            ChecksumCollection::new(
                CollectionKind::for_documents(kind),
                self.documents(kind)
                    .values()
                    .map(|d| d.checksums().checksum),
            )
        };

        ProjectChecksums {
            checksum: replica_core::Checksum::NULL,
            attributes: self.attributes.checksum(),
            compilation_options: self.compilation_options.checksum(),
            parse_options: self.parse_options.checksum(),
            documents: documents(DocumentKind::Document),
            additional_documents: documents(DocumentKind::Additional),
            analyzer_config_documents: documents(DocumentKind::AnalyzerConfig),
            project_references: ChecksumCollection::new(
                CollectionKind::ProjectReferences,
                self.project_references.iter().map(AssetValue::checksum),
            ),
            metadata_references: ChecksumCollection::new(
                CollectionKind::MetadataReferences,
                self.metadata_references.iter().map(|r| r.checksum()),
            ),
            analyzer_references: ChecksumCollection::new(
                CollectionKind::AnalyzerReferences,
                self.analyzer_references.iter().map(|r| r.checksum()),
            ),
        }
        .sealed()
    }

    pub(crate) fn with_attributes(&self, attributes: ProjectAttributes) -> Result<Self> {
        let current = &self.attributes;
        if attributes.id != current.id {
            return Err(SnapshotError::ImmutableField {
                node: "project",
                field: "id",
            });
        }
        if attributes.language != current.language {
            return Err(SnapshotError::ImmutableField {
                node: "project",
                field: "language",
            });
        }
        if attributes.is_submission != current.is_submission {
            return Err(SnapshotError::ImmutableField {
                node: "project",
                field: "is_submission",
            });
        }
        Ok(self.modified(|p| p.attributes = Arc::new(attributes)))
    }

    pub(crate) fn with_compilation_options(&self, options: CompilationOptions) -> Self {
        self.modified(|p| p.compilation_options = Arc::new(options))
    }

    pub(crate) fn with_parse_options(&self, options: ParseOptions) -> Self {
        self.modified(|p| p.parse_options = Arc::new(options))
    }

    pub(crate) fn with_project_references(&self, references: Vec<ProjectReference>) -> Self {
        self.modified(|p| p.project_references = Arc::new(references))
    }

    pub(crate) fn with_metadata_references(&self, references: Vec<Arc<MetadataReference>>) -> Self {
        self.modified(|p| p.metadata_references = Arc::new(references))
    }

    pub(crate) fn with_analyzer_references(&self, references: Vec<Arc<AnalyzerReference>>) -> Self {
        self.modified(|p| p.analyzer_references = Arc::new(references))
    }

    /// Reuse already shared reference lists (structural sharing across versions)
    pub(crate) fn with_shared_project_references(&self, references: &ProjectState) -> Self {
        self.modified(|p| p.project_references = references.project_references.clone())
    }

    pub(crate) fn add_documents(
        &self,
        kind: DocumentKind,
        infos: Vec<DocumentInfo>,
    ) -> Result<Self> {
        for info in &infos {
            if self.contains_document(info.attributes.id) {
                return Err(SnapshotError::DuplicateDocument {
                    project: self.id(),
                    id: info.attributes.id,
                });
            }
        }
        let added = document_map(self.id(), kind, infos)?;

        Ok(self.modified(|p| {
            let map = Arc::make_mut(p.documents_slot(kind));
            map.extend(added);
        }))
    }

    pub(crate) fn remove_documents(&self, kind: DocumentKind, ids: &[DocumentId]) -> Result<Self> {
        for id in ids {
            if !self.documents(kind).contains_key(id) {
                return Err(SnapshotError::UnknownDocument {
                    project: self.id(),
                    id: *id,
                });
            }
        }

        Ok(self.modified(|p| {
            let map = Arc::make_mut(p.documents_slot(kind));
            for id in ids {
                map.remove(id);
            }
        }))
    }

    /// Replace one document node, sharing all its siblings
    pub(crate) fn with_document(&self, document: DocumentState) -> Self {
        let kind = document.kind();
        self.modified(|p| {
            let map = Arc::make_mut(p.documents_slot(kind));
            map.insert(document.id(), Arc::new(document));
        })
    }

    /// Back to a description that can recreate this node
    pub fn to_info(&self) -> ProjectInfo {
        let documents = |kind: DocumentKind| {
            self.documents(kind)
                .values()
                .map(|d| d.to_info())
                .collect::<Vec<_>>()
        };

        ProjectInfo {
            attributes: (*self.attributes).clone(),
            compilation_options: (*self.compilation_options).clone(),
            parse_options: (*self.parse_options).clone(),
            documents: documents(DocumentKind::Document),
            additional_documents: documents(DocumentKind::Additional),
            analyzer_config_documents: documents(DocumentKind::AnalyzerConfig),
            project_references: (*self.project_references).clone(),
            metadata_references: (*self.metadata_references).clone(),
            analyzer_references: (*self.analyzer_references).clone(),
        }
    }
}
