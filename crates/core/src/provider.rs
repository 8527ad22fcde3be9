//! Asset provider: checksum-keyed cache in front of an asset source

use crate::asset::{Asset, AssetValue};
use crate::error::AssetError;
use crate::hash::Checksum;
use crate::store::AssetSource;
use crate::tree::{DocumentChecksums, ProjectChecksums};
use ahash::AHashSet;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Counters describing how the provider talked to its source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    /// Calls made to the source
    pub round_trips: u64,
    /// Assets received from the source
    pub assets_fetched: u64,
    /// Lookups answered from the cache
    pub cache_hits: u64,
}

impl FetchStats {
    /// Counters accumulated since `earlier`
    pub fn since(&self, earlier: &FetchStats) -> FetchStats {
        FetchStats {
            round_trips: self.round_trips - earlier.round_trips,
            assets_fetched: self.assets_fetched - earlier.assets_fetched,
            cache_hits: self.cache_hits - earlier.cache_hits,
        }
    }
}

#[derive(Default)]
struct Counters {
    round_trips: AtomicU64,
    assets_fetched: AtomicU64,
    cache_hits: AtomicU64,
}

/// Resolves checksums to values, fetching misses from the source
///
/// The cache is keyed by content, so entries never go stale and are never
/// invalidated. Concurrent synchronizations can share one provider.
pub struct AssetProvider {
    source: Arc<dyn AssetSource>,
    cache: DashMap<Checksum, Asset>,
    counters: Counters,
    verify: bool,
}

impl AssetProvider {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            cache: DashMap::new(),
            counters: Counters::default(),
            verify: true,
        }
    }

    /// Skip re-hashing fetched assets (trusted sources only)
    pub fn without_verification(mut self) -> Self {
        self.verify = false;
        self
    }

    pub fn stats(&self) -> FetchStats {
        FetchStats {
            round_trips: self.counters.round_trips.load(Ordering::Relaxed),
            assets_fetched: self.counters.assets_fetched.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_cached(&self, checksum: &Checksum) -> bool {
        self.cache.contains_key(checksum)
    }

    /// Seed the cache with a value the caller already holds
    pub fn insert<T: AssetValue>(&self, value: T) -> Checksum {
        let checksum = value.checksum();
        self.cache
            .entry(checksum)
            .or_insert_with(|| value.into_asset());
        checksum
    }

    /// Fetch a single value, awaiting the source on a miss
    pub async fn get<T: AssetValue>(
        &self,
        checksum: Checksum,
        cancel: &CancellationToken,
    ) -> Result<T, AssetError> {
        if let Some(value) = self.lookup::<T>(&checksum)? {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        self.fetch_missing(vec![checksum], cancel).await?;
        self.get_cached(checksum)
    }

    /// Fetch many values with at most one round trip
    ///
    /// The result follows the order of first appearance in `checksums`,
    /// with duplicates removed.
    pub async fn get_many<T: AssetValue>(
        &self,
        checksums: impl IntoIterator<Item = Checksum>,
        cancel: &CancellationToken,
    ) -> Result<Vec<(Checksum, T)>, AssetError> {
        let mut seen = AHashSet::new();
        let unique: Vec<Checksum> = checksums.into_iter().filter(|c| seen.insert(*c)).collect();

        self.prefetch(unique.iter().copied(), cancel).await?;

        unique
            .into_iter()
            .map(|checksum| Ok((checksum, self.get_cached::<T>(checksum)?)))
            .collect()
    }

    /// A value that must already be cached (after a bulk fetch)
    pub fn get_cached<T: AssetValue>(&self, checksum: Checksum) -> Result<T, AssetError> {
        self.lookup::<T>(&checksum)?
            .ok_or(AssetError::Missing { checksum })
    }

    /// Bring every listed checksum into the cache in one round trip
    ///
    /// Returns the number of checksums that had to be fetched.
    pub async fn prefetch(
        &self,
        checksums: impl IntoIterator<Item = Checksum>,
        cancel: &CancellationToken,
    ) -> Result<usize, AssetError> {
        let mut seen = AHashSet::new();
        let missing: Vec<Checksum> = checksums
            .into_iter()
            .filter(|c| !c.is_null() && seen.insert(*c) && !self.cache.contains_key(c))
            .collect();

        let count = missing.len();
        if count > 0 {
            self.fetch_missing(missing, cancel).await?;
        }
        Ok(count)
    }

    /// Bulk-fetch the complete checksum trees of the given projects
    ///
    /// One round trip per tree level: project nodes, then their values and
    /// document nodes, then document attributes and texts.
    pub async fn synchronize_projects(
        &self,
        project_checksums: &[Checksum],
        cancel: &CancellationToken,
    ) -> Result<(), AssetError> {
        if project_checksums.is_empty() {
            return Ok(());
        }

        self.prefetch(project_checksums.iter().copied(), cancel)
            .await?;

        let mut children = Vec::new();
        let mut documents = Vec::new();
        for checksum in project_checksums {
            let project = self.get_cached::<ProjectChecksums>(*checksum)?;
            children.extend(project.value_children());
            documents.extend(project.all_documents());
        }
        children.extend(documents.iter().copied());
        self.prefetch(children, cancel).await?;

        self.prefetch_document_leaves(&documents, cancel).await?;
        debug!(
            projects = project_checksums.len(),
            documents = documents.len(),
            "synchronized project assets"
        );
        Ok(())
    }

    /// Bulk-fetch document nodes and their attributes and texts
    pub async fn synchronize_documents(
        &self,
        document_checksums: &[Checksum],
        cancel: &CancellationToken,
    ) -> Result<(), AssetError> {
        if document_checksums.is_empty() {
            return Ok(());
        }

        self.prefetch(document_checksums.iter().copied(), cancel)
            .await?;
        self.prefetch_document_leaves(document_checksums, cancel)
            .await?;
        debug!(
            documents = document_checksums.len(),
            "synchronized document assets"
        );
        Ok(())
    }

    async fn prefetch_document_leaves(
        &self,
        document_checksums: &[Checksum],
        cancel: &CancellationToken,
    ) -> Result<(), AssetError> {
        let mut leaves = Vec::with_capacity(document_checksums.len() * 2);
        for checksum in document_checksums {
            let document = self.get_cached::<DocumentChecksums>(*checksum)?;
            leaves.push(document.attributes);
            leaves.push(document.text);
        }
        self.prefetch(leaves, cancel).await?;
        Ok(())
    }

    fn lookup<T: AssetValue>(&self, checksum: &Checksum) -> Result<Option<T>, AssetError> {
        match self.cache.get(checksum) {
            None => Ok(None),
            Some(entry) => match T::from_asset_ref(entry.value()) {
                Some(value) => Ok(Some(value.clone())),
                None => Err(AssetError::KindMismatch {
                    checksum: *checksum,
                    expected: T::KIND,
                    actual: entry.value().kind(),
                }),
            },
        }
    }

    async fn fetch_missing(
        &self,
        checksums: Vec<Checksum>,
        cancel: &CancellationToken,
    ) -> Result<(), AssetError> {
        if cancel.is_cancelled() {
            return Err(AssetError::Cancelled);
        }

        trace!(count = checksums.len(), "fetching assets from source");
        self.counters.round_trips.fetch_add(1, Ordering::Relaxed);

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AssetError::Cancelled),
            result = self.source.fetch(&checksums, cancel) => result?,
        };

        self.counters
            .assets_fetched
            .fetch_add(fetched.len() as u64, Ordering::Relaxed);

        for (requested, asset) in fetched {
            if self.verify {
                let actual = asset.checksum();
                if actual != requested {
                    return Err(AssetError::Corrupt { requested, actual });
                }
            }
            self.cache.entry(requested).or_insert(asset);
        }

        match checksums.iter().find(|c| !self.cache.contains_key(c)) {
            Some(checksum) => Err(AssetError::Missing {
                checksum: *checksum,
            }),
            None => Ok(()),
        }
    }
}
