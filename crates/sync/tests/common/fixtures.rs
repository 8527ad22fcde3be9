//! Builders for test solutions

use replica_core::{
    AssetProvider, DocumentAttributes, DocumentId, ProjectAttributes, ProjectId, ScratchPool,
    SolutionAttributes, SolutionId,
};
use replica_snapshot::{DocumentInfo, ProjectInfo, Solution};
use replica_sync::{SyncConfig, Synchronizer, ValidationMode};
use std::sync::Arc;

use super::RecordingSource;

pub fn solution() -> Solution {
    Solution::empty(SolutionAttributes {
        id: SolutionId::new(),
        file_path: Some("/work/App.sln".to_string()),
        version: 1,
    })
}

pub fn project(name: &str) -> ProjectInfo {
    let mut attributes = ProjectAttributes::new(ProjectId::new(), name, "C#");
    attributes.file_path = Some(format!("/work/{name}/{name}.csproj"));
    ProjectInfo::new(attributes)
}

pub fn document(name: &str, text: &str) -> DocumentInfo {
    let mut attributes = DocumentAttributes::new(DocumentId::new(), name);
    attributes.file_path = Some(format!("/work/{name}"));
    DocumentInfo::new(attributes, text)
}

/// Synchronizer over a fresh provider, validating every result
pub fn synchronizer(source: &Arc<RecordingSource>) -> (Synchronizer, Arc<ScratchPool>) {
    let config = SyncConfig {
        validate: ValidationMode::Always,
        ..SyncConfig::default()
    };
    synchronizer_with(source, config)
}

pub fn synchronizer_with(
    source: &Arc<RecordingSource>,
    config: SyncConfig,
) -> (Synchronizer, Arc<ScratchPool>) {
    let provider = Arc::new(AssetProvider::new(source.clone()));
    let pool = Arc::new(ScratchPool::new());
    (Synchronizer::new(provider, pool.clone(), config), pool)
}
