//! Shared utilities for CLI commands

use crate::config::CliConfig;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use replica_core::{AssetProvider, Checksum, DirectoryAssetSource, ScratchPool};
use replica_sync::Synchronizer;
use std::path::Path;
use std::sync::Arc;

pub const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Open the directory store, failing if it was never created
pub fn open_store(path: &Path) -> Result<DirectoryAssetSource> {
    if !path.join("objects").is_dir() {
        anyhow::bail!("No asset store at {}", path.display());
    }
    DirectoryAssetSource::open(path)
        .with_context(|| format!("Failed to open asset store {}", path.display()))
}

/// Synchronizer reading from the store at `path`
pub fn synchronizer(config: &CliConfig, path: &Path) -> Result<Synchronizer> {
    let store = open_store(path)?;
    let provider = Arc::new(AssetProvider::new(Arc::new(store)));
    Ok(Synchronizer::new(
        provider,
        Arc::new(ScratchPool::new()),
        config.sync.clone(),
    ))
}

/// Checksum as a short, colored label
pub fn label(checksum: &Checksum) -> String {
    checksum.short().yellow().to_string()
}

pub fn header(title: &str) {
    println!("{}", title.bold());
    println!("{RULE}");
    println!();
}
