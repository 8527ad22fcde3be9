//! Live document nodes

use crate::info::DocumentInfo;
use replica_core::{
    AssetValue, DocumentAttributes, DocumentChecksums, DocumentId, DocumentKind, SourceText,
};
use std::sync::{Arc, OnceLock};

/// Immutable document node
///
/// Checksums are computed on first request and memoized; since the node
/// never changes they stay valid for its whole lifetime.
#[derive(Debug)]
pub struct DocumentState {
    kind: DocumentKind,
    attributes: Arc<DocumentAttributes>,
    text: SourceText,
    checksums: OnceLock<DocumentChecksums>,
}

impl DocumentState {
    pub fn new(kind: DocumentKind, info: DocumentInfo) -> Self {
        Self::from_parts(kind, Arc::new(info.attributes), info.text)
    }

    fn from_parts(
        kind: DocumentKind,
        attributes: Arc<DocumentAttributes>,
        text: SourceText,
    ) -> Self {
        Self {
            kind,
            attributes,
            text,
            checksums: OnceLock::new(),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.attributes.id
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.attributes.name
    }

    pub fn attributes(&self) -> &DocumentAttributes {
        &self.attributes
    }

    pub fn text(&self) -> &SourceText {
        &self.text
    }

    pub fn checksums(&self) -> &DocumentChecksums {
        self.checksums.get_or_init(|| {
            DocumentChecksums::new(self.attributes.checksum(), self.text.checksum())
        })
    }

    pub(crate) fn with_text(&self, text: SourceText) -> Self {
        Self::from_parts(self.kind, self.attributes.clone(), text)
    }

    pub(crate) fn with_attributes(&self, attributes: DocumentAttributes) -> Self {
        Self::from_parts(self.kind, Arc::new(attributes), self.text.clone())
    }

    /// Back to a description that can recreate this node
    pub fn to_info(&self) -> DocumentInfo {
        DocumentInfo {
            attributes: (*self.attributes).clone(),
            text: self.text.clone(),
        }
    }
}
