//! Asset source that records every request it serves

use async_trait::async_trait;
use parking_lot::Mutex;
use replica_core::{
    Asset, AssetError, AssetSink, AssetSource, CancellationToken, Checksum, InMemoryAssetSource,
};
use replica_snapshot::Solution;

#[derive(Default)]
pub struct RecordingSource {
    store: InMemoryAssetSource,
    requests: Mutex<Vec<Vec<Checksum>>>,
    cancel_at: Mutex<Option<(usize, CancellationToken)>>,
}

impl RecordingSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a solution and return its root checksum
    pub fn publish(&self, solution: &Solution) -> Checksum {
        solution.publish(&self.store).unwrap()
    }

    pub fn store(&self) -> &InMemoryAssetSource {
        &self.store
    }

    pub fn requests(&self) -> Vec<Vec<Checksum>> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn clear(&self) {
        self.requests.lock().clear();
    }

    /// Trigger `token` when the `n`-th request (1-based) arrives
    pub fn cancel_on_request(&self, n: usize, token: CancellationToken) {
        *self.cancel_at.lock() = Some((n, token));
    }
}

#[async_trait]
impl AssetSource for RecordingSource {
    async fn fetch(
        &self,
        checksums: &[Checksum],
        cancel: &CancellationToken,
    ) -> Result<Vec<(Checksum, Asset)>, AssetError> {
        let count = {
            let mut requests = self.requests.lock();
            requests.push(checksums.to_vec());
            requests.len()
        };
        if let Some((n, token)) = self.cancel_at.lock().as_ref() {
            if *n == count {
                token.cancel();
            }
        }
        self.store.fetch(checksums, cancel).await
    }
}

impl AssetSink for RecordingSource {
    fn put(&self, checksum: Checksum, asset: Asset) -> Result<(), AssetError> {
        self.store.put(checksum, asset)
    }
}
