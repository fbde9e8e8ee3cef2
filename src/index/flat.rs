//! Exact brute-force search over the store.
//!
//! No auxiliary structure beyond the set of live ids: every `search` reads
//! every live vector back out of the store and sorts.

use crate::distance::distance;
use crate::error::Result;
use crate::storage::Store;
use crate::vector::SearchResult;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use tracing::warn;

/// Brute-force index: the live id set, plus a store handle held elsewhere.
pub struct FlatIndex {
    ids: RwLock<FxHashSet<u64>>,
}

impl FlatIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: RwLock::new(FxHashSet::default()),
        }
    }

    /// Reconstructs the live id set from a freshly opened store. Flat keeps
    /// no sidecar of its own, so on open its state is exactly the store's
    /// current live ids.
    #[must_use]
    pub fn from_store(store: &Store) -> Self {
        Self {
            ids: RwLock::new(store.ids().into_iter().collect()),
        }
    }

    /// Writes `vector` under `id` and records it as live.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::DimensionMismatch`] or
    /// [`crate::error::Error::Io`] from the underlying store write.
    pub fn insert(&self, store: &Store, id: u64, vector: &[f32]) -> Result<()> {
        store.write(id, vector)?;
        self.ids.write().insert(id);
        Ok(())
    }

    /// Removes `id` from the live set and deletes it from the store.
    /// Deleting an unknown id is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Io`] or
    /// [`crate::error::Error::StoreCorruption`] from the underlying delete.
    pub fn delete(&self, store: &Store, id: u64) -> Result<()> {
        self.ids.write().remove(&id);
        store.delete(id)
    }

    /// Scores every live id against `query` and returns the `k` closest,
    /// ascending by distance. A read failure on an individual id is logged
    /// and skipped rather than failing the whole search.
    ///
    /// # Errors
    ///
    /// Never returns an error itself; kept fallible to match the uniform
    /// engine surface other engines require.
    pub fn search(&self, store: &Store, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let ids: Vec<u64> = self.ids.read().iter().copied().collect();
        let mut scored: Vec<(u64, f32, Vec<f32>)> = Vec::with_capacity(ids.len());

        for id in ids {
            match store.read(id) {
                Ok(Some(v)) => {
                    let d = distance(query, &v);
                    scored.push((id, d, v));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(id, error = %e, "flat search: skipping unreadable record");
                }
            }
        }

        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(id, distance, vector)| SearchResult { id, distance, vector })
            .collect())
    }

    /// Number of live ids.
    #[must_use]
    pub fn size(&self) -> usize {
        self.ids.read().len()
    }

    /// Clears the store and the live id set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Io`] if the store fails to truncate.
    pub fn clear(&self, store: &Store) -> Result<()> {
        store.clear()?;
        self.ids.write().clear();
        Ok(())
    }
}

impl Default for FlatIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(dim: usize) -> Store {
        let dir = tempdir().unwrap();
        Store::open(dir.path().join("vectors.db"), dim, 100).unwrap()
    }

    #[test]
    fn test_identity_search_orders_by_distance() {
        // Arrange
        let store = store(3);
        let flat = FlatIndex::new();
        flat.insert(&store, 1, &[1.0, 0.0, 0.0]).unwrap();
        flat.insert(&store, 2, &[0.0, 1.0, 0.0]).unwrap();
        flat.insert(&store, 3, &[0.0, 0.0, 1.0]).unwrap();

        // Act
        let results = flat.search(&store, &[1.0, 0.0, 0.0], 2).unwrap();

        // Assert
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 1);
        assert!(results[0].distance < 1e-3);
        assert!(results[1].distance > results[0].distance);
    }

    #[test]
    fn test_k_greater_than_size_returns_all() {
        // Arrange
        let store = store(3);
        let flat = FlatIndex::new();
        flat.insert(&store, 1, &[1.0, 0.0, 0.0]).unwrap();
        flat.insert(&store, 2, &[0.0, 1.0, 0.0]).unwrap();
        flat.insert(&store, 3, &[0.0, 0.0, 1.0]).unwrap();

        // Act
        let results = flat.search(&store, &[1.0, 0.0, 0.0], 10).unwrap();

        // Assert
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_delete_removes_from_live_set() {
        // Arrange
        let store = store(2);
        let flat = FlatIndex::new();
        flat.insert(&store, 1, &[1.0, 1.0]).unwrap();
        flat.insert(&store, 2, &[2.0, 2.0]).unwrap();

        // Act
        flat.delete(&store, 1).unwrap();

        // Assert
        assert_eq!(flat.size(), 1);
        let results = flat.search(&store, &[1.0, 1.0], 10).unwrap();
        assert!(results.iter().all(|r| r.id != 1));
    }

    #[test]
    fn test_delete_unknown_id_is_not_an_error() {
        // Arrange
        let store = store(2);
        let flat = FlatIndex::new();

        // Act & Assert
        assert!(flat.delete(&store, 42).is_ok());
    }

    #[test]
    fn test_clear_empties_index_and_store() {
        // Arrange
        let store = store(2);
        let flat = FlatIndex::new();
        flat.insert(&store, 1, &[1.0, 1.0]).unwrap();

        // Act
        flat.clear(&store).unwrap();

        // Assert
        assert_eq!(flat.size(), 0);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_from_store_recovers_live_ids() {
        // Arrange
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.db");
        {
            let store = Store::open(&path, 2, 100).unwrap();
            store.write(1, &[1.0, 1.0]).unwrap();
            store.write(2, &[2.0, 2.0]).unwrap();
            store.close().unwrap();
        }
        let store = Store::open(&path, 2, 100).unwrap();

        // Act
        let flat = FlatIndex::from_store(&store);

        // Assert
        assert_eq!(flat.size(), 2);
    }
}
