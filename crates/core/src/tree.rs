//! Checksum tree: the content-addressed description of a snapshot
//!
//! Mirrors the live tree layer by layer. Each node carries the checksum of
//! its own attributes plus one checksummed collection per child list, and
//! its own checksum is a pure function of those components.

use crate::asset::AssetKind;
use crate::hash::{Checksum, ChecksumHasher};
use crate::model::DocumentKind;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Which child list a collection describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    Projects,
    Documents,
    AdditionalDocuments,
    AnalyzerConfigDocuments,
    ProjectReferences,
    MetadataReferences,
    AnalyzerReferences,
}

impl CollectionKind {
    fn tag(self) -> u8 {
        0x40 + self as u8
    }

    pub fn for_documents(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Document => CollectionKind::Documents,
            DocumentKind::Additional => CollectionKind::AdditionalDocuments,
            DocumentKind::AnalyzerConfig => CollectionKind::AnalyzerConfigDocuments,
        }
    }
}

/// An ordered list of member checksums with a checksum over the whole list
///
/// A changed collection checksum says nothing about which members changed;
/// use [`crate::diff::diff_collections`] for that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumCollection {
    kind: CollectionKind,
    checksum: Checksum,
    members: SmallVec<[Checksum; 4]>,
}

impl ChecksumCollection {
    pub fn new(kind: CollectionKind, members: impl IntoIterator<Item = Checksum>) -> Self {
        let members: SmallVec<[Checksum; 4]> = members.into_iter().collect();
        let checksum = Self::compute(kind, &members);
        Self {
            kind,
            checksum,
            members,
        }
    }

    pub fn empty(kind: CollectionKind) -> Self {
        Self::new(kind, std::iter::empty())
    }

    fn compute(kind: CollectionKind, members: &[Checksum]) -> Checksum {
        let mut hasher = ChecksumHasher::new(kind.tag());
        hasher.update_len(members.len());
        for member in members {
            hasher.update_checksum(member);
        }
        hasher.finalize()
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn checksum(&self) -> Checksum {
        self.checksum
    }

    pub fn members(&self) -> &[Checksum] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the stored checksum matches the members (false only for
    /// tampered or mis-decoded data)
    pub fn is_consistent(&self) -> bool {
        Self::compute(self.kind, &self.members) == self.checksum
    }

    fn recomputed(&self) -> Checksum {
        Self::compute(self.kind, &self.members)
    }
}

/// Checksum tree root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionChecksums {
    pub checksum: Checksum,
    pub attributes: Checksum,
    pub projects: ChecksumCollection,
    pub analyzer_references: ChecksumCollection,
    /// `Checksum::NULL` when no frozen document is attached
    pub frozen_document_identity: Checksum,
    pub frozen_document_text: Checksum,
}

impl SolutionChecksums {
    pub fn new(
        attributes: Checksum,
        projects: ChecksumCollection,
        analyzer_references: ChecksumCollection,
        frozen_document: Option<(Checksum, Checksum)>,
    ) -> Self {
        let (identity, text) = frozen_document.unwrap_or((Checksum::NULL, Checksum::NULL));
        let mut checksums = Self {
            checksum: Checksum::NULL,
            attributes,
            projects,
            analyzer_references,
            frozen_document_identity: identity,
            frozen_document_text: text,
        };
        checksums.checksum = checksums.compute_checksum();
        checksums
    }

    pub fn compute_checksum(&self) -> Checksum {
        ChecksumHasher::new(AssetKind::SolutionChecksums.tag())
            .update_checksum(&self.attributes)
            .update_checksum(&self.projects.recomputed())
            .update_checksum(&self.analyzer_references.recomputed())
            .update_checksum(&self.frozen_document_identity)
            .update_checksum(&self.frozen_document_text)
            .finalize()
    }

    /// Both halves of the frozen document pair, when one is attached
    pub fn frozen_document(&self) -> Option<(Checksum, Checksum)> {
        if self.frozen_document_identity.is_null() || self.frozen_document_text.is_null() {
            None
        } else {
            Some((self.frozen_document_identity, self.frozen_document_text))
        }
    }
}

/// Checksums of one project and its child collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectChecksums {
    pub checksum: Checksum,
    pub attributes: Checksum,
    pub compilation_options: Checksum,
    pub parse_options: Checksum,
    pub documents: ChecksumCollection,
    pub additional_documents: ChecksumCollection,
    pub analyzer_config_documents: ChecksumCollection,
    pub project_references: ChecksumCollection,
    pub metadata_references: ChecksumCollection,
    pub analyzer_references: ChecksumCollection,
}

impl ProjectChecksums {
    /// Recompute and store the node checksum from the components
    pub fn sealed(mut self) -> Self {
        self.checksum = self.compute_checksum();
        self
    }

    pub fn compute_checksum(&self) -> Checksum {
        ChecksumHasher::new(AssetKind::ProjectChecksums.tag())
            .update_checksum(&self.attributes)
            .update_checksum(&self.compilation_options)
            .update_checksum(&self.parse_options)
            .update_checksum(&self.documents.recomputed())
            .update_checksum(&self.additional_documents.recomputed())
            .update_checksum(&self.analyzer_config_documents.recomputed())
            .update_checksum(&self.project_references.recomputed())
            .update_checksum(&self.metadata_references.recomputed())
            .update_checksum(&self.analyzer_references.recomputed())
            .finalize()
    }

    pub fn documents_of(&self, kind: DocumentKind) -> &ChecksumCollection {
        match kind {
            DocumentKind::Document => &self.documents,
            DocumentKind::Additional => &self.additional_documents,
            DocumentKind::AnalyzerConfig => &self.analyzer_config_documents,
        }
    }

    /// Every document checksum across the three document collections
    pub fn all_documents(&self) -> impl Iterator<Item = Checksum> + '_ {
        DocumentKind::ALL
            .into_iter()
            .flat_map(move |kind| self.documents_of(kind).members().iter().copied())
    }

    /// Direct value children: attributes, options and reference members
    pub fn value_children(&self) -> impl Iterator<Item = Checksum> + '_ {
        [self.attributes, self.compilation_options, self.parse_options]
            .into_iter()
            .chain(self.project_references.members().iter().copied())
            .chain(self.metadata_references.members().iter().copied())
            .chain(self.analyzer_references.members().iter().copied())
    }
}

/// Checksums of one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChecksums {
    pub checksum: Checksum,
    pub attributes: Checksum,
    pub text: Checksum,
}

impl DocumentChecksums {
    pub fn new(attributes: Checksum, text: Checksum) -> Self {
        let mut checksums = Self {
            checksum: Checksum::NULL,
            attributes,
            text,
        };
        checksums.checksum = checksums.compute_checksum();
        checksums
    }

    pub fn compute_checksum(&self) -> Checksum {
        ChecksumHasher::new(AssetKind::DocumentChecksums.tag())
            .update_checksum(&self.attributes)
            .update_checksum(&self.text)
            .finalize()
    }
}
