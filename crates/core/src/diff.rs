//! Collection diff over checksum identity, backed by a pool of scratch sets

use crate::hash::Checksum;
use ahash::AHashSet;
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Reusable checksum sets for one or more synchronization passes
///
/// Sets are handed out as [`PooledSet`] guards and come back cleared when the
/// guard drops, whether the holder finished, failed or was cancelled.
pub struct ScratchPool {
    free: Mutex<Vec<AHashSet<Checksum>>>,
    max_retained: usize,
    outstanding: AtomicUsize,
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::with_max_retained(32)
    }

    /// Pool that keeps at most `max_retained` idle sets around
    pub fn with_max_retained(max_retained: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_retained,
            outstanding: AtomicUsize::new(0),
        }
    }

    pub fn acquire(&self) -> PooledSet<'_> {
        let set = self.free.lock().pop().unwrap_or_default();
        self.outstanding.fetch_add(1, Ordering::Relaxed);
        PooledSet {
            pool: self,
            set: Some(set),
        }
    }

    /// Number of sets currently checked out
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Relaxed)
    }

    /// Number of idle sets ready for reuse
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn release(&self, mut set: AHashSet<Checksum>) {
        self.outstanding.fetch_sub(1, Ordering::Relaxed);
        set.clear();
        let mut free = self.free.lock();
        if free.len() < self.max_retained {
            free.push(set);
        }
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A checksum set borrowed from a [`ScratchPool`]
pub struct PooledSet<'a> {
    pool: &'a ScratchPool,
    set: Option<AHashSet<Checksum>>,
}

impl Deref for PooledSet<'_> {
    type Target = AHashSet<Checksum>;

    fn deref(&self) -> &Self::Target {
        // Only `Drop` takes the set out
        self.set.as_ref().expect("pooled set used after release")
    }
}

impl DerefMut for PooledSet<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.set.as_mut().expect("pooled set used after release")
    }
}

impl Drop for PooledSet<'_> {
    fn drop(&mut self) {
        if let Some(set) = self.set.take() {
            self.pool.release(set);
        }
    }
}

impl std::fmt::Debug for PooledSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Symmetric difference of two checksum collections
#[derive(Debug)]
pub struct CollectionDiff<'a> {
    /// Members of `old` that are not in `new`
    pub removed_only: PooledSet<'a>,
    /// Members of `new` that are not in `old`
    pub added_only: PooledSet<'a>,
}

impl CollectionDiff<'_> {
    pub fn is_empty(&self) -> bool {
        self.removed_only.is_empty() && self.added_only.is_empty()
    }
}

/// Compute `old - new` and `new - old` over checksum identity
///
/// Inputs may be in any order and may contain duplicates. Runs in O(n).
pub fn diff_collections<'a>(
    pool: &'a ScratchPool,
    old: &[Checksum],
    new: &[Checksum],
) -> CollectionDiff<'a> {
    let mut removed_only = pool.acquire();
    let mut added_only = pool.acquire();

    removed_only.extend(old.iter().copied());
    added_only.extend(new.iter().copied());

    for checksum in new {
        removed_only.remove(checksum);
    }
    for checksum in old {
        added_only.remove(checksum);
    }

    CollectionDiff {
        removed_only,
        added_only,
    }
}
