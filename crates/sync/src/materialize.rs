//! Turning fetched checksum trees into node descriptions

use crate::config::SyncConfig;
use crate::error::Result;
use replica_core::{
    AnalyzerReference, AssetProvider, AssetValue, CancellationToken, Checksum, ChecksumCollection,
    CompilationOptions, DocumentAttributes, DocumentChecksums, DocumentKind, MetadataReference,
    ParseOptions, ProjectAttributes, ProjectChecksums, ProjectReference, SourceText,
};
use replica_snapshot::{DocumentInfo, ProjectInfo, ReferenceCache};
use std::sync::Arc;

/// Builds [`ProjectInfo`]s out of assets held by the provider
///
/// Reference values are interned through the [`ReferenceCache`] so every
/// project materialized by one synchronizer shares equal references.
pub struct ProjectMaterializer<'a> {
    provider: &'a AssetProvider,
    references: &'a ReferenceCache,
    config: &'a SyncConfig,
}

impl<'a> ProjectMaterializer<'a> {
    pub fn new(
        provider: &'a AssetProvider,
        references: &'a ReferenceCache,
        config: &'a SyncConfig,
    ) -> Self {
        Self {
            provider,
            references,
            config,
        }
    }

    /// Full description of the project stored under `checksum`
    ///
    /// Returns `None` when the project cannot be represented on this side.
    /// Assets already in the provider's cache are not fetched again.
    pub async fn project_info(
        &self,
        checksum: Checksum,
        cancel: &CancellationToken,
    ) -> Result<Option<ProjectInfo>> {
        let tree: ProjectChecksums = self.provider.get(checksum, cancel).await?;
        let attributes: ProjectAttributes = self.provider.get(tree.attributes, cancel).await?;
        if !self.config.supports_language(&attributes.language) {
            return Ok(None);
        }

        self.provider
            .synchronize_projects(&[checksum], cancel)
            .await?;

        let mut info = ProjectInfo::new(attributes);
        info.compilation_options = self
            .provider
            .get_cached::<CompilationOptions>(tree.compilation_options)?;
        info.parse_options = self
            .provider
            .get_cached::<ParseOptions>(tree.parse_options)?;
        info.project_references = self.cached_values(&tree.project_references)?;
        info.metadata_references = self.metadata_references(&tree.metadata_references)?;
        info.analyzer_references = self.analyzer_references(&tree.analyzer_references)?;

        for kind in DocumentKind::ALL {
            let documents = tree
                .documents_of(kind)
                .members()
                .iter()
                .map(|c| self.cached_document(*c))
                .collect::<Result<Vec<_>>>()?;
            *info.documents_mut(kind) = documents;
        }
        Ok(Some(info))
    }

    /// Full description of one document; fetches whatever is not cached yet
    pub async fn document_info(
        &self,
        checksum: Checksum,
        cancel: &CancellationToken,
    ) -> Result<DocumentInfo> {
        self.provider
            .synchronize_documents(&[checksum], cancel)
            .await?;
        self.cached_document(checksum)
    }

    pub(crate) fn cached_document(&self, checksum: Checksum) -> Result<DocumentInfo> {
        let tree: DocumentChecksums = self.provider.get_cached(checksum)?;
        Ok(DocumentInfo {
            attributes: self
                .provider
                .get_cached::<DocumentAttributes>(tree.attributes)?,
            text: self.provider.get_cached::<SourceText>(tree.text)?,
        })
    }

    /// Members of a collection, in collection order
    pub(crate) fn cached_values<T: AssetValue>(
        &self,
        collection: &ChecksumCollection,
    ) -> Result<Vec<T>> {
        collection
            .members()
            .iter()
            .map(|c| Ok(self.provider.get_cached::<T>(*c)?))
            .collect()
    }

    pub(crate) fn metadata_references(
        &self,
        collection: &ChecksumCollection,
    ) -> Result<Vec<Arc<MetadataReference>>> {
        Ok(self
            .cached_values::<MetadataReference>(collection)?
            .into_iter()
            .map(|r| self.references.metadata(r))
            .collect())
    }

    pub(crate) fn analyzer_references(
        &self,
        collection: &ChecksumCollection,
    ) -> Result<Vec<Arc<AnalyzerReference>>> {
        Ok(self
            .cached_values::<AnalyzerReference>(collection)?
            .into_iter()
            .map(|r| self.references.analyzer(r))
            .collect())
    }

    /// Fetch a reference collection in one round trip and intern its members
    pub(crate) async fn fetch_analyzer_references(
        &self,
        collection: &ChecksumCollection,
        cancel: &CancellationToken,
    ) -> Result<Vec<Arc<AnalyzerReference>>> {
        self.provider
            .prefetch(collection.members().iter().copied(), cancel)
            .await?;
        self.analyzer_references(collection)
    }

    pub(crate) fn project_references(
        &self,
        collection: &ChecksumCollection,
    ) -> Result<Vec<ProjectReference>> {
        self.cached_values(collection)
    }
}
