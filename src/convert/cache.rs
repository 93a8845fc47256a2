//! The decoded region currently being converted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::region::{RegionData, RegionPos};

/// Holds the decoded data of at most one region, keyed by file name.
///
/// Only the orchestrator mutates it (insert before dispatch, remove after all
/// chunks completed). Chunk units take a short read lock to clone the `Arc`.
#[derive(Default)]
pub struct RegionCache {
    regions: RwLock<HashMap<String, Arc<RegionData>>>,
    inserts: AtomicUsize,
    removals: AtomicUsize,
    peak: AtomicUsize,
}

impl RegionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `data` the resident region.
    pub fn insert(&self, name: &str, data: Arc<RegionData>) {
        let mut regions = self.regions.write().unwrap_or_else(PoisonError::into_inner);
        if !regions.is_empty() {
            log::error!(
                "Region cache still holds {:?} while inserting {}",
                regions.keys().collect::<Vec<_>>(),
                name
            );
        }
        regions.insert(name.to_string(), data);
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.peak.fetch_max(regions.len(), Ordering::SeqCst);
    }

    /// Evict a region. Returns whether it was resident.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self
            .regions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some();
        if removed {
            self.removals.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    /// The resident region with the given coordinates, whatever its file extension.
    pub fn region_at(&self, pos: RegionPos) -> Option<Arc<RegionData>> {
        self.regions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|region| region.pos() == pos)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.regions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut regions = self.regions.write().unwrap_or_else(PoisonError::into_inner);
        self.removals.fetch_add(regions.len(), Ordering::SeqCst);
        regions.clear();
    }

    /// Highest number of regions ever resident at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }
}
