//! Publish a manifest-described solution to a store

use crate::manifest::Manifest;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use replica_core::DirectoryAssetSource;
use std::path::Path;
use tracing::info;

pub async fn run(manifest: &Path, store: &Path) -> Result<()> {
    // 1. Build the solution from the manifest and the files it names
    let solution = Manifest::load(manifest)?;

    // 2. Open (or create) the store
    let store = DirectoryAssetSource::open(store)
        .with_context(|| format!("Failed to open asset store {}", store.display()))?;

    // 3. Publish every asset; the store skips objects it already holds
    let checksum = solution
        .publish(&store)
        .context("Failed to publish snapshot")?;

    let documents: usize = solution.projects().map(|p| p.document_count()).sum();
    info!(%checksum, projects = solution.project_count(), documents, "published snapshot");

    println!(
        "{} {} projects, {} documents",
        "Published".green().bold(),
        solution.project_count(),
        documents
    );
    println!("{checksum}");
    Ok(())
}
