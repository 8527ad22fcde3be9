//! Replica Core - content-addressed primitives for snapshot synchronization
//!
//! This crate provides the foundational layer:
//! - BLAKE3 checksums
//! - The value model carried by snapshots
//! - Checksum trees and collection diffing
//! - Asset sources and the caching asset provider

pub mod asset;
pub mod diff;
pub mod error;
pub mod hash;
pub mod model;
pub mod provider;
pub mod store;
pub mod tree;

// Re-export main types for convenience
pub use asset::{Asset, AssetKind, AssetValue};
pub use diff::{diff_collections, CollectionDiff, PooledSet, ScratchPool};
pub use error::AssetError;
pub use hash::{checksum_of, hash_bytes, Checksum, ChecksumHasher};
pub use model::{
    AnalyzerReference, CompilationOptions, DocumentAttributes, DocumentId, DocumentKind,
    DocumentationMode, FrozenDocumentIdentity, MetadataReference, NullableContext, OutputKind,
    ParseOptions, ProjectAttributes, ProjectId, ProjectReference, SolutionAttributes, SolutionId,
    SourceHashAlgorithm, SourceKind, SourceText,
};
pub use provider::{AssetProvider, FetchStats};
pub use store::{AssetSink, AssetSource, DirectoryAssetSource, InMemoryAssetSource};
pub use tree::{
    ChecksumCollection, CollectionKind, DocumentChecksums, ProjectChecksums, SolutionChecksums,
};

/// Re-exported so downstream crates share one cancellation type
pub use tokio_util::sync::CancellationToken;
