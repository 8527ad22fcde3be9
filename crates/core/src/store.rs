//! Asset sources (the remote side of the provider) and sinks (publishers)

use crate::asset::Asset;
use crate::error::AssetError;
use crate::hash::Checksum;
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Where assets come from on a cache miss
///
/// One `fetch` call is one round trip. Checksums the source does not know
/// are left out of the answer; the provider decides what that means.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn fetch(
        &self,
        checksums: &[Checksum],
        cancel: &CancellationToken,
    ) -> Result<Vec<(Checksum, Asset)>, AssetError>;
}

/// Where a publishing side writes the assets of a snapshot
pub trait AssetSink {
    fn put(&self, checksum: Checksum, asset: Asset) -> Result<(), AssetError>;
}

/// Content store held entirely in memory
#[derive(Default)]
pub struct InMemoryAssetSource {
    assets: DashMap<Checksum, Asset>,
}

impl InMemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn contains(&self, checksum: &Checksum) -> bool {
        self.assets.contains_key(checksum)
    }

    /// Drop an asset (used to simulate a sender that disagrees about the tree)
    pub fn remove(&self, checksum: &Checksum) -> Option<Asset> {
        self.assets.remove(checksum).map(|(_, asset)| asset)
    }
}

#[async_trait]
impl AssetSource for InMemoryAssetSource {
    async fn fetch(
        &self,
        checksums: &[Checksum],
        cancel: &CancellationToken,
    ) -> Result<Vec<(Checksum, Asset)>, AssetError> {
        if cancel.is_cancelled() {
            return Err(AssetError::Cancelled);
        }

        Ok(checksums
            .iter()
            .filter_map(|checksum| {
                self.assets
                    .get(checksum)
                    .map(|asset| (*checksum, asset.value().clone()))
            })
            .collect())
    }
}

impl AssetSink for InMemoryAssetSource {
    fn put(&self, checksum: Checksum, asset: Asset) -> Result<(), AssetError> {
        self.assets.entry(checksum).or_insert(asset);
        Ok(())
    }
}

/// Content store on disk
///
/// Layout:
/// ```text
/// <root>/
///   objects/<hh>/<remaining 62 hex chars>   zstd(bincode(Asset))
///   tmp/                                    staging for atomic writes
/// ```
pub struct DirectoryAssetSource {
    root: PathBuf,
    compression_level: i32,
}

impl DirectoryAssetSource {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, AssetError> {
        let root = root.into();
        std::fs::create_dir_all(root.join("objects"))?;
        std::fs::create_dir_all(root.join("tmp"))?;
        Ok(Self {
            root,
            compression_level: 3,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the object file for a checksum
    pub fn object_path(&self, checksum: &Checksum) -> PathBuf {
        let hex = checksum.to_hex();
        self.root.join("objects").join(&hex[..2]).join(&hex[2..])
    }

    fn decode_object(checksum: &Checksum, bytes: &[u8]) -> Result<Asset, AssetError> {
        let raw = zstd::decode_all(bytes).map_err(|e| AssetError::Decode {
            reason: format!("object {} is not valid zstd: {}", checksum.short(), e),
        })?;
        Asset::decode(&raw)
    }
}

#[async_trait]
impl AssetSource for DirectoryAssetSource {
    async fn fetch(
        &self,
        checksums: &[Checksum],
        cancel: &CancellationToken,
    ) -> Result<Vec<(Checksum, Asset)>, AssetError> {
        if cancel.is_cancelled() {
            return Err(AssetError::Cancelled);
        }

        // Reads are independent, keep them all in flight
        let reads = checksums.iter().map(|checksum| {
            let path = self.object_path(checksum);
            let checksum = *checksum;
            async move {
                match tokio::fs::read(&path).await {
                    Ok(bytes) => Ok(Some((checksum, bytes))),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(AssetError::Io(e)),
                }
            }
        });
        let found = futures::future::try_join_all(reads).await?;

        let mut assets = Vec::with_capacity(found.len());
        for (checksum, bytes) in found.into_iter().flatten() {
            assets.push((checksum, Self::decode_object(&checksum, &bytes)?));
        }
        debug!(
            requested = checksums.len(),
            found = assets.len(),
            "read objects from {}",
            self.root.display()
        );
        Ok(assets)
    }
}

impl AssetSink for DirectoryAssetSource {
    fn put(&self, checksum: Checksum, asset: Asset) -> Result<(), AssetError> {
        let target = self.object_path(&checksum);
        if target.exists() {
            // Content-addressed: an existing object is already correct
            return Ok(());
        }

        let raw = asset.encode()?;
        let compressed = zstd::encode_all(raw.as_slice(), self.compression_level)?;
        atomic_write(&self.root.join("tmp"), &target, &compressed)
    }
}

/// Atomic write helper
///
/// Writes data to a temporary file, fsyncs it, then renames it to the target path.
pub fn atomic_write(tmp_dir: &Path, target: &Path, data: &[u8]) -> Result<(), AssetError> {
    use std::io::Write;

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_dir.join(format!("{}.tmp", uuid::Uuid::new_v4()));
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    if let Err(e) = std::fs::rename(&tmp_path, target) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}
