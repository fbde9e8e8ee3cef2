//! Cluster-assignment state for the IVF engine: bootstrap-then-assign
//! insert, multi-probe search, incremental centroid maintenance.
//!
//! Linear scan over centroids for nearest-centroid assignment, a bounded
//! merge of per-cluster candidate scans for search. Uses `parking_lot`
//! locks and the crate's own `Error` taxonomy throughout, with reads that go
//! through [`crate::storage::Store`] rather than a separate fixed-file
//! vector storage.

use crate::distance::distance;
use crate::error::{Error, Result};
use crate::storage::Store;
use crate::vector::{centroid_id, SearchResult};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::warn;

/// Parameters fixed at construction (or restored verbatim from a sidecar).
#[derive(Debug, Clone, Copy)]
pub struct IvfParams {
    /// Target number of clusters to bootstrap before falling back to
    /// nearest-centroid assignment.
    pub n_clusters: usize,
    /// Number of nearest clusters probed per search.
    pub n_probe: usize,
}

impl Default for IvfParams {
    fn default() -> Self {
        Self {
            n_clusters: 100,
            n_probe: 1,
        }
    }
}

/// Cluster-assignment state. Centroid vectors themselves are ordinary
/// records in the store, addressed by the reserved descending id range (see
/// [`centroid_id`]); this struct holds only the bookkeeping.
pub struct ClusterState {
    /// Parameters this state was constructed (or loaded) with.
    pub params: IvfParams,
    /// Ordered `(cluster_id, centroid_record_id)`, position == `cluster_id`.
    centroids: RwLock<Vec<(i32, u64)>>,
    /// `cluster_id -> member vector ids`.
    clusters: RwLock<FxHashMap<i32, Vec<u64>>>,
    /// `vector id -> cluster_id`, inverse of `clusters`.
    vector_to_cluster: RwLock<FxHashMap<u64, i32>>,
}

impl ClusterState {
    /// Creates an empty cluster state with no centroids yet bootstrapped.
    #[must_use]
    pub fn new(params: IvfParams) -> Self {
        Self {
            params,
            centroids: RwLock::new(Vec::new()),
            clusters: RwLock::new(FxHashMap::default()),
            vector_to_cluster: RwLock::new(FxHashMap::default()),
        }
    }

    /// Reconstructs state directly from sidecar-loaded parts (used by
    /// `sidecar::load`), inverting the flat assignment list into the
    /// `clusters` map.
    #[must_use]
    pub(super) fn from_parts(
        params: IvfParams,
        centroids: Vec<(i32, u64)>,
        assignments: Vec<(u64, i32)>,
    ) -> Self {
        let mut clusters: FxHashMap<i32, Vec<u64>> = FxHashMap::default();
        let mut vector_to_cluster = FxHashMap::default();
        vector_to_cluster.reserve(assignments.len());
        for (vector_id, cluster_id) in assignments {
            clusters.entry(cluster_id).or_default().push(vector_id);
            vector_to_cluster.insert(vector_id, cluster_id);
        }
        Self {
            params,
            centroids: RwLock::new(centroids),
            clusters: RwLock::new(clusters),
            vector_to_cluster: RwLock::new(vector_to_cluster),
        }
    }

    /// Number of live (non-centroid) assigned vectors.
    #[must_use]
    pub fn size(&self) -> usize {
        self.vector_to_cluster.read().len()
    }

    /// Snapshot of `(cluster_id, centroid_record_id)`, for sidecar saves.
    #[must_use]
    pub(super) fn centroids_snapshot(&self) -> Vec<(i32, u64)> {
        self.centroids.read().clone()
    }

    /// Snapshot of `(vector_id, cluster_id)` assignments, for sidecar saves.
    #[must_use]
    pub(super) fn assignments_snapshot(&self) -> Vec<(u64, i32)> {
        self.vector_to_cluster
            .read()
            .iter()
            .map(|(&vid, &cid)| (vid, cid))
            .collect()
    }

    /// Inserts `(id, vector)`: bootstraps a new centroid while cluster count
    /// is below target, otherwise assigns to the nearest centroid and
    /// incrementally updates it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::DimensionMismatch`] from the
    /// underlying store operations.
    pub fn insert(&self, store: &Store, id: u64, vector: &[f32]) -> Result<()> {
        store.write(id, vector)?;

        let cluster_count = self.centroids.read().len();
        if cluster_count < self.params.n_clusters {
            #[allow(clippy::cast_possible_truncation)]
            let cluster_id = cluster_count as i32;
            let rec_id = centroid_id(cluster_count);
            store.write(rec_id, vector)?;
            self.centroids.write().push((cluster_id, rec_id));
            self.clusters.write().insert(cluster_id, vec![id]);
            self.vector_to_cluster.write().insert(id, cluster_id);
            return Ok(());
        }

        let Some((cluster_id, rec_id, centroid_vec)) = self.nearest_centroid(store, vector)?
        else {
            return Ok(());
        };

        self.clusters.write().entry(cluster_id).or_default().push(id);
        self.vector_to_cluster.write().insert(id, cluster_id);

        #[allow(clippy::cast_precision_loss)]
        let n = self
            .clusters
            .read()
            .get(&cluster_id)
            .map_or(1, Vec::len) as f32;
        let updated: Vec<f32> = centroid_vec
            .iter()
            .zip(vector)
            .map(|(c, v)| (c * (n - 1.0) + v) / n)
            .collect();
        store.write(rec_id, &updated)?;

        Ok(())
    }

    /// Ranks every centroid by L2 distance to `query`, returning the closest
    /// `(cluster_id, centroid_record_id, centroid_vector)`.
    fn nearest_centroid(
        &self,
        store: &Store,
        query: &[f32],
    ) -> Result<Option<(i32, u64, Vec<f32>)>> {
        let centroids = self.centroids.read().clone();
        let mut best: Option<(i32, u64, Vec<f32>, f32)> = None;

        for (cluster_id, rec_id) in centroids {
            match store.read(rec_id) {
                Ok(Some(v)) => {
                    let d = distance(query, &v);
                    if best.as_ref().map_or(true, |b| d < b.3) {
                        best = Some((cluster_id, rec_id, v, d));
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(cluster_id, error = %e, "ivf: skipping unreadable centroid"),
            }
        }

        Ok(best.map(|(cid, rid, v, _)| (cid, rid, v)))
    }

    /// Ranks centroids against `query`, probes the closest `n_probe`
    /// clusters, and returns the `k` closest member vectors overall,
    /// ascending by distance. Read failures on individual members are
    /// logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidK`] if `k == 0`.
    pub fn search(&self, store: &Store, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(Error::InvalidK(k));
        }

        let centroids = self.centroids.read().clone();
        if centroids.is_empty() {
            return Ok(Vec::new());
        }

        let mut ranked: Vec<(i32, f32)> = Vec::with_capacity(centroids.len());
        let mut centroid_rec_ids = rustc_hash::FxHashSet::default();
        for (cluster_id, rec_id) in &centroids {
            centroid_rec_ids.insert(*rec_id);
            match store.read(*rec_id) {
                Ok(Some(v)) => ranked.push((*cluster_id, distance(query, &v))),
                Ok(None) => {}
                Err(e) => warn!(cluster_id, error = %e, "ivf search: skipping unreadable centroid"),
            }
        }
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

        let clusters = self.clusters.read();
        let mut candidates: Vec<(u64, f32)> = Vec::new();
        for (cluster_id, _) in ranked.into_iter().take(self.params.n_probe) {
            let Some(members) = clusters.get(&cluster_id) else {
                continue;
            };
            for &member_id in members {
                if centroid_rec_ids.contains(&member_id) {
                    continue;
                }
                match store.read(member_id) {
                    Ok(Some(v)) => candidates.push((member_id, distance(query, &v))),
                    Ok(None) => {}
                    Err(e) => warn!(id = member_id, error = %e, "ivf search: skipping unreadable member"),
                }
            }
        }
        drop(clusters);

        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        candidates.truncate(k);

        let mut results = Vec::with_capacity(candidates.len());
        for (id, dist) in candidates {
            if let Some(v) = store.read(id)? {
                results.push(SearchResult {
                    id,
                    distance: dist,
                    vector: v,
                });
            }
        }
        Ok(results)
    }

    /// Removes `id` from its cluster and recomputes that cluster's centroid
    /// as the mean of its remaining members, if any remain. Forwarding an
    /// unassigned id to the store is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::StoreCorruption`] from the
    /// underlying store operations.
    pub fn delete(&self, store: &Store, id: u64) -> Result<()> {
        let Some(cluster_id) = self.vector_to_cluster.write().remove(&id) else {
            return store.delete(id);
        };
        store.delete(id)?;

        let mut clusters = self.clusters.write();
        let Some(members) = clusters.get_mut(&cluster_id) else {
            return Ok(());
        };
        if let Some(pos) = members.iter().position(|&m| m == id) {
            members.swap_remove(pos);
        }
        if members.is_empty() {
            return Ok(());
        }
        let members = members.clone();
        drop(clusters);

        let Some(rec_id) = self
            .centroids
            .read()
            .iter()
            .find(|(cid, _)| *cid == cluster_id)
            .map(|&(_, rid)| rid)
        else {
            return Ok(());
        };

        let dim = store.dimension();
        let mut sum = vec![0.0f32; dim];
        let mut count = 0u32;
        for &member_id in &members {
            if let Some(v) = store.read(member_id)? {
                for (s, x) in sum.iter_mut().zip(&v) {
                    *s += x;
                }
                count += 1;
            }
        }
        if count > 0 {
            #[allow(clippy::cast_precision_loss)]
            let n = count as f32;
            for s in &mut sum {
                *s /= n;
            }
            store.write(rec_id, &sum)?;
        }

        Ok(())
    }

    /// Clears the store and every piece of cluster-assignment state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the store fails to truncate.
    pub fn clear(&self, store: &Store) -> Result<()> {
        store.clear()?;
        self.centroids.write().clear();
        self.clusters.write().clear();
        self.vector_to_cluster.write().clear();
        Ok(())
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
