//! Fully materialized node descriptions used to create live nodes

use replica_core::{
    AnalyzerReference, CompilationOptions, DocumentAttributes, DocumentKind, MetadataReference,
    ParseOptions, ProjectAttributes, ProjectReference, SolutionAttributes, SourceText,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub attributes: DocumentAttributes,
    pub text: SourceText,
}

impl DocumentInfo {
    pub fn new(attributes: DocumentAttributes, text: impl Into<SourceText>) -> Self {
        Self {
            attributes,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub attributes: ProjectAttributes,
    pub compilation_options: CompilationOptions,
    pub parse_options: ParseOptions,
    pub documents: Vec<DocumentInfo>,
    pub additional_documents: Vec<DocumentInfo>,
    pub analyzer_config_documents: Vec<DocumentInfo>,
    pub project_references: Vec<ProjectReference>,
    pub metadata_references: Vec<Arc<MetadataReference>>,
    pub analyzer_references: Vec<Arc<AnalyzerReference>>,
}

impl ProjectInfo {
    /// Empty project with default options
    pub fn new(attributes: ProjectAttributes) -> Self {
        Self {
            attributes,
            compilation_options: CompilationOptions::default(),
            parse_options: ParseOptions::default(),
            documents: Vec::new(),
            additional_documents: Vec::new(),
            analyzer_config_documents: Vec::new(),
            project_references: Vec::new(),
            metadata_references: Vec::new(),
            analyzer_references: Vec::new(),
        }
    }

    pub fn with_documents(mut self, kind: DocumentKind, documents: Vec<DocumentInfo>) -> Self {
        *self.documents_mut(kind) = documents;
        self
    }

    pub fn with_project_references(mut self, references: Vec<ProjectReference>) -> Self {
        self.project_references = references;
        self
    }

    pub fn with_metadata_references(mut self, references: Vec<Arc<MetadataReference>>) -> Self {
        self.metadata_references = references;
        self
    }

    pub fn with_analyzer_references(mut self, references: Vec<Arc<AnalyzerReference>>) -> Self {
        self.analyzer_references = references;
        self
    }

    pub fn documents_mut(&mut self, kind: DocumentKind) -> &mut Vec<DocumentInfo> {
        match kind {
            DocumentKind::Document => &mut self.documents,
            DocumentKind::Additional => &mut self.additional_documents,
            DocumentKind::AnalyzerConfig => &mut self.analyzer_config_documents,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionInfo {
    pub attributes: SolutionAttributes,
    pub projects: Vec<ProjectInfo>,
    pub analyzer_references: Vec<Arc<AnalyzerReference>>,
}

impl SolutionInfo {
    pub fn new(attributes: SolutionAttributes) -> Self {
        Self {
            attributes,
            projects: Vec::new(),
            analyzer_references: Vec::new(),
        }
    }
}
