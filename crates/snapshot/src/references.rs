//! Interning of metadata and analyzer references
//!
//! Equal references received from the host resolve to one shared object, so
//! projects created in different synchronizations can share reference nodes.

use crate::solution::Solution;
use ahash::AHashMap;
use parking_lot::Mutex;
use replica_core::{AnalyzerReference, MetadataReference};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct ReferenceCache {
    metadata: Mutex<AHashMap<MetadataReference, Arc<MetadataReference>>>,
    analyzers: Mutex<AHashMap<AnalyzerReference, Arc<AnalyzerReference>>>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared instance equal to `reference`
    pub fn metadata(&self, reference: MetadataReference) -> Arc<MetadataReference> {
        let mut map = self.metadata.lock();
        if let Some(existing) = map.get(&reference) {
            return existing.clone();
        }
        let shared = Arc::new(reference.clone());
        map.insert(reference, shared.clone());
        shared
    }

    /// Shared instance equal to `reference`
    pub fn analyzer(&self, reference: AnalyzerReference) -> Arc<AnalyzerReference> {
        let mut map = self.analyzers.lock();
        if let Some(existing) = map.get(&reference) {
            return existing.clone();
        }
        let shared = Arc::new(reference.clone());
        map.insert(reference, shared.clone());
        shared
    }

    /// Register every reference the solution already holds
    pub fn seed_from(&self, solution: &Solution) {
        let mut metadata = self.metadata.lock();
        let mut analyzers = self.analyzers.lock();

        let solution_level = solution.analyzer_references().iter();
        let project_level = solution
            .projects()
            .flat_map(|p| p.analyzer_references().iter());
        for reference in solution_level.chain(project_level) {
            analyzers
                .entry((**reference).clone())
                .or_insert_with(|| reference.clone());
        }
        for reference in solution
            .projects()
            .flat_map(|p| p.metadata_references().iter())
        {
            metadata
                .entry((**reference).clone())
                .or_insert_with(|| reference.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.metadata.lock().len() + self.analyzers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
