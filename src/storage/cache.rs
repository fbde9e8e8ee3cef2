//! Bounded LRU vector cache.
//!
//! `IndexMap`-backed O(1) design (front = LRU, back = MRU), independent of
//! the store's own lock.

#![allow(clippy::cast_precision_loss)]

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of evictions.
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate in `[0.0, 1.0]`.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded LRU cache from vector id to an owned copy of its payload.
///
/// Capacity 0 disables caching outright (every `get` misses, `insert` is a
/// no-op) rather than degenerating into a zero-length `IndexMap` that would
/// otherwise evict-then-reinsert on every single call.
pub struct VectorCache {
    capacity: usize,
    inner: RwLock<IndexMap<u64, Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl VectorCache {
    /// Creates a cache bounded at `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(IndexMap::with_capacity(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Looks up `id`, updating recency on a hit.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<Vec<f32>> {
        if self.capacity == 0 {
            return None;
        }

        let hit = self.inner.read().get(&id).cloned();
        match &hit {
            Some(v) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.move_to_back(id, v);
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
        }
        hit
    }

    /// Inserts or refreshes an entry, evicting the LRU entry if at capacity.
    pub fn insert(&self, id: u64, vector: Vec<f32>) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.inner.write();
        if inner.shift_remove(&id).is_some() {
            inner.insert(id, vector);
            return;
        }

        if inner.len() >= self.capacity && inner.shift_remove_index(0).is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }

        inner.insert(id, vector);
    }

    /// Evicts `id` if present.
    pub fn remove(&self, id: u64) {
        self.inner.write().swap_remove(&id);
    }

    /// Clears every entry.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Returns a snapshot of hit/miss/eviction counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn move_to_back(&self, id: u64, value: &[f32]) {
        let mut inner = self.inner.write();
        inner.shift_remove(&id);
        inner.insert(id, value.to_vec());
    }
}
