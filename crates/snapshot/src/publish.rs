//! Writing a solution's complete asset tree into a sink

use crate::document::DocumentState;
use crate::project::ProjectState;
use crate::solution::Solution;
use ahash::AHashSet;
use replica_core::{AssetError, AssetSink, AssetValue, Checksum, DocumentKind};
use tracing::debug;

struct Publisher<'a> {
    sink: &'a dyn AssetSink,
    written: AHashSet<Checksum>,
}

impl Publisher<'_> {
    fn put<T: AssetValue>(&mut self, value: &T) -> Result<Checksum, AssetError> {
        let checksum = value.checksum();
        if self.written.insert(checksum) {
            self.sink.put(checksum, value.clone().into_asset())?;
        }
        Ok(checksum)
    }

    fn project(&mut self, project: &ProjectState) -> Result<(), AssetError> {
        self.put(project.checksums())?;
        self.put(project.attributes())?;
        self.put(project.compilation_options())?;
        self.put(project.parse_options())?;
        for reference in project.project_references() {
            self.put(reference)?;
        }
        for reference in project.metadata_references() {
            self.put(reference.as_ref())?;
        }
        for reference in project.analyzer_references() {
            self.put(reference.as_ref())?;
        }
        for kind in DocumentKind::ALL {
            for document in project.documents(kind).values() {
                self.document(document)?;
            }
        }
        Ok(())
    }

    fn document(&mut self, document: &DocumentState) -> Result<(), AssetError> {
        self.put(document.checksums())?;
        self.put(document.attributes())?;
        self.put(document.text())?;
        Ok(())
    }
}

impl Solution {
    /// Store every asset reachable from this snapshot's checksum tree
    ///
    /// Returns the root checksum. Each distinct asset is written once.
    pub fn publish(&self, sink: &dyn AssetSink) -> Result<Checksum, AssetError> {
        let mut publisher = Publisher {
            sink,
            written: AHashSet::new(),
        };

        let root = publisher.put(self.checksums())?;
        publisher.put(self.attributes())?;
        for reference in self.analyzer_references() {
            publisher.put(reference.as_ref())?;
        }
        for project in self.projects() {
            publisher.project(project)?;
        }
        if let Some(frozen) = self.frozen_document() {
            publisher.put(&frozen.identity)?;
            publisher.put(&frozen.text)?;
        }

        debug!(
            solution = %self.id(),
            root = %root.short(),
            assets = publisher.written.len(),
            "published solution"
        );
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use crate::info::{DocumentInfo, ProjectInfo};
    use crate::solution::Solution;
    use replica_core::{
        AssetProvider, CancellationToken, DocumentAttributes, DocumentId, DocumentKind,
        InMemoryAssetSource, ProjectAttributes, ProjectChecksums, ProjectId, SolutionAttributes,
        SolutionChecksums, SolutionId, SourceText,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn test_published_tree_is_complete() {
        let doc = DocumentInfo::new(
            DocumentAttributes::new(DocumentId::new(), "a.cs"),
            "class A {}",
        );
        let info = ProjectInfo::new(ProjectAttributes::new(ProjectId::new(), "App", "C#"))
            .with_documents(DocumentKind::Document, vec![doc]);
        let solution = Solution::empty(SolutionAttributes {
            id: SolutionId::new(),
            file_path: None,
            version: 1,
        })
        .add_project(info)
        .unwrap();

        let source = Arc::new(InMemoryAssetSource::new());
        let root = solution.publish(source.as_ref()).unwrap();
        assert_eq!(root, solution.checksum());

        let provider = AssetProvider::new(source);
        let cancel = CancellationToken::new();
        let tree: SolutionChecksums = provider.get(root, &cancel).await.unwrap();
        provider
            .synchronize_projects(tree.projects.members(), &cancel)
            .await
            .unwrap();

        let project: ProjectChecksums = provider.get_cached(tree.projects.members()[0]).unwrap();
        let text: SourceText = provider
            .get(
                provider
                    .get_cached::<replica_core::DocumentChecksums>(project.documents.members()[0])
                    .unwrap()
                    .text,
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(text.as_str(), "class A {}");
    }

    #[test]
    fn test_publish_writes_shared_values_once() {
        let text = "same";
        let docs = (0..2)
            .map(|i| {
                DocumentInfo::new(
                    DocumentAttributes::new(DocumentId::new(), format!("{i}.cs")),
                    text,
                )
            })
            .collect();
        let info = ProjectInfo::new(ProjectAttributes::new(ProjectId::new(), "App", "C#"))
            .with_documents(DocumentKind::Document, docs);
        let solution = Solution::empty(SolutionAttributes {
            id: SolutionId::new(),
            file_path: None,
            version: 0,
        })
        .add_project(info)
        .unwrap();

        let sink = InMemoryAssetSource::new();
        solution.publish(&sink).unwrap();
        // root, solution attrs, project node, attrs, two option sets,
        // two document nodes, two document attrs, one shared text
        assert_eq!(sink.len(), 11);
    }
}
