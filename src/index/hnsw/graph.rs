//! The HNSW layered proximity graph.
//!
//! An xorshift64 PRNG drives per-node level sampling, `parking_lot` guards
//! the node map, and `search_layer` runs a bounded best-first traversal.
//! Keyed by a sparse `HashMap<u64, Node>` over caller-chosen vector ids,
//! since this graph holds no vector data of its own: every distance
//! computation reads through to the store.

use crate::error::{Error, Result};
use crate::heap::{Candidate, CandidateHeap};
use crate::storage::Store;
use crate::distance::distance;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tracing::warn;

/// A graph-resident node: its neighbor lists, one per level it participates in.
struct Node {
    top_level: i32,
    /// `neighbors[level]` is the adjacency list at that level.
    neighbors: Vec<Vec<u64>>,
}

/// Construction and search parameters, frozen at graph creation (or restored
/// verbatim from a sidecar load).
#[derive(Debug, Clone, Copy)]
pub struct HnswParams {
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub m_l: f64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 50,
            m_l: 1.0 / std::f64::consts::LN_2,
        }
    }
}

/// The in-memory HNSW graph: neighbor topology plus entry-point bookkeeping.
/// Holds no vector payloads; every distance computation reads through `Store`.
pub struct Graph {
    pub params: HnswParams,
    nodes: RwLock<FxHashMap<u64, Node>>,
    entry_point: RwLock<Option<u64>>,
    max_level: AtomicI64,
    rng_state: AtomicU64,
}

impl Graph {
    #[must_use]
    pub fn new(params: HnswParams) -> Self {
        Self {
            params,
            nodes: RwLock::new(FxHashMap::default()),
            entry_point: RwLock::new(None),
            max_level: AtomicI64::new(-1),
            rng_state: AtomicU64::new(0x5DEE_CE66_D1A4_B5B5),
        }
    }

    /// Reconstructs a graph directly from sidecar-loaded state (used by
    /// `sidecar::load`). Each tuple is `(id, top_level, neighbors_by_level)`.
    #[must_use]
    pub(super) fn from_parts(
        params: HnswParams,
        raw_nodes: Vec<(u64, i32, Vec<Vec<u64>>)>,
        entry_point: Option<u64>,
        max_level: i32,
    ) -> Self {
        let mut nodes = FxHashMap::default();
        nodes.reserve(raw_nodes.len());
        for (id, top_level, neighbors) in raw_nodes {
            nodes.insert(id, Node { top_level, neighbors });
        }
        Self {
            params,
            nodes: RwLock::new(nodes),
            entry_point: RwLock::new(entry_point),
            max_level: AtomicI64::new(i64::from(max_level)),
            rng_state: AtomicU64::new(0x5DEE_CE66_D1A4_B5B5),
        }
    }

    #[must_use]
    pub fn entry_point(&self) -> Option<u64> {
        *self.entry_point.read()
    }

    #[must_use]
    pub fn max_level(&self) -> i32 {
        #[allow(clippy::cast_possible_truncation)]
        let level = self.max_level.load(Ordering::Relaxed) as i32;
        level
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.nodes.read().contains_key(&id)
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn random_level(&self) -> i32 {
        let mut state = self.rng_state.load(Ordering::Relaxed);
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        self.rng_state.store(state, Ordering::Relaxed);

        let uniform = ((state as f64) / (u64::MAX as f64)).max(f64::MIN_POSITIVE);
        let level = (-uniform.ln() * self.params.m_l).floor();
        level.max(0.0) as i32
    }

    /// Inserts `(id, vector)`: writes to the store, samples a level, and
    /// rewires the graph around it. Overwrites in place (no topology change)
    /// if `id` already exists.
    pub fn insert(&self, store: &Store, id: u64, vector: &[f32]) -> Result<()> {
        if self.contains(id) {
            store.write(id, vector)?;
            return Ok(());
        }

        store.write(id, vector)?;
        let level = self.random_level();

        if self.is_empty() {
            let neighbors = (0..=level).map(|_| Vec::new()).collect();
            self.nodes.write().insert(
                id,
                Node {
                    top_level: level,
                    neighbors,
                },
            );
            *self.entry_point.write() = Some(id);
            self.max_level.store(i64::from(level), Ordering::Relaxed);
            return Ok(());
        }

        let max_level = self.max_level();
        let mut cursor = self.entry_point().expect("non-empty graph has an entry point");

        for lvl in (level.max(0) + 1..=max_level).rev() {
            if lvl > max_level {
                continue;
            }
            let results = self.search_layer(store, vector, cursor, lvl, 1)?;
            if let Some(best) = results.first() {
                cursor = best.id;
            }
        }

        let mut per_level_neighbors: Vec<(i32, Vec<u64>)> = Vec::new();
        for lvl in (0..=max_level.min(level)).rev() {
            let candidates = self.search_layer(store, vector, cursor, lvl, self.params.ef_construction)?;
            let selected: Vec<u64> = candidates.iter().take(self.params.m).map(|c| c.id).collect();
            if let Some(best) = candidates.first() {
                cursor = best.id;
            }
            per_level_neighbors.push((lvl, selected));
        }

        let neighbors_by_level = {
            let mut v: Vec<Vec<u64>> = (0..=level).map(|_| Vec::new()).collect();
            for (lvl, selected) in &per_level_neighbors {
                #[allow(clippy::cast_sign_loss)]
                let idx = *lvl as usize;
                v[idx] = selected.clone();
            }
            v
        };

        self.nodes.write().insert(
            id,
            Node {
                top_level: level,
                neighbors: neighbors_by_level,
            },
        );

        for (lvl, selected) in &per_level_neighbors {
            for &b in selected {
                self.link_back(store, b, id, *lvl)?;
            }
        }

        if level > max_level {
            *self.entry_point.write() = Some(id);
            self.max_level.store(i64::from(level), Ordering::Relaxed);
        }

        Ok(())
    }

    /// Appends `new_id` to `b`'s neighbor list at `level`, pruning back to
    /// `M` by distance (ties broken by id) if it overflows.
    fn link_back(&self, store: &Store, b: u64, new_id: u64, level: i32) -> Result<()> {
        #[allow(clippy::cast_sign_loss)]
        let idx = level as usize;

        let mut nodes = self.nodes.write();
        let Some(node) = nodes.get_mut(&b) else {
            return Ok(());
        };
        if idx >= node.neighbors.len() {
            return Ok(());
        }
        node.neighbors[idx].push(new_id);

        if node.neighbors[idx].len() > self.params.m {
            let ids = node.neighbors[idx].clone();
            drop(nodes);

            let Some(b_vec) = store.read(b)? else {
                return Ok(());
            };
            let mut scored: Vec<(u64, f32)> = Vec::with_capacity(ids.len());
            for candidate in ids {
                if let Some(v) = store.read(candidate)? {
                    scored.push((candidate, distance(&b_vec, &v)));
                }
            }
            scored.sort_by(|a, c| a.1.total_cmp(&c.1).then(a.0.cmp(&c.0)));
            scored.truncate(self.params.m);

            let mut nodes = self.nodes.write();
            if let Some(node) = nodes.get_mut(&b) {
                if idx < node.neighbors.len() {
                    node.neighbors[idx] = scored.into_iter().map(|(id, _)| id).collect();
                }
            }
        }

        Ok(())
    }

    /// Layer-restricted best-first exploration from `entry`, using a
    /// bounded heap, a 0.9x frontier filter, and an iteration cap.
    fn search_layer(
        &self,
        store: &Store,
        query: &[f32],
        entry: u64,
        level: i32,
        ef: usize,
    ) -> Result<Vec<Candidate>> {
        let mut heap = CandidateHeap::new(ef);
        let mut visited: FxHashSet<u64> = FxHashSet::default();
        let mut frontier: Vec<u64> = Vec::new();

        let entry_vec = match store.read(entry) {
            Ok(Some(v)) => v,
            Ok(None) => return Ok(Vec::new()),
            Err(e) => {
                warn!(id = entry, error = %e, "hnsw search_layer: skipping unreadable entry");
                return Ok(Vec::new());
            }
        };
        let d0 = distance(query, &entry_vec);
        heap.add(Candidate { id: entry, distance: d0 });
        visited.insert(entry);
        frontier.push(entry);

        #[allow(clippy::cast_possible_truncation)]
        let iteration_cap = (3 * ef).max(16);
        let mut iterations = 0usize;
        let mut stale_rounds = 0usize;

        while let Some(current) = frontier.pop() {
            iterations += 1;
            if iterations > iteration_cap || stale_rounds > ef {
                break;
            }

            let neighbor_ids = {
                let nodes = self.nodes.read();
                let Some(node) = nodes.get(&current) else {
                    continue;
                };
                if node.top_level < level {
                    continue;
                }
                #[allow(clippy::cast_sign_loss)]
                let idx = level as usize;
                node.neighbors.get(idx).cloned().unwrap_or_default()
            };

            let mut inserted_this_round = false;
            for b in neighbor_ids {
                if !visited.insert(b) {
                    continue;
                }
                let b_vec = match store.read(b) {
                    Ok(Some(v)) => v,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(id = b, error = %e, "hnsw search_layer: skipping unreadable neighbor");
                        continue;
                    }
                };
                let d = distance(query, &b_vec);
                let added = heap.add(Candidate { id: b, distance: d });
                if added {
                    inserted_this_round = true;
                    let should_enqueue = !heap.is_full() || d < 0.9 * heap.peek().distance;
                    if should_enqueue {
                        frontier.push(b);
                    }
                }
            }

            if inserted_this_round {
                stale_rounds = 0;
            } else {
                stale_rounds += 1;
            }
        }

        Ok(heap.extract_top(ef))
    }

    /// Validates dimension and k, descends greedily to layer 0, returns the
    /// best `k` ids with their distances. Callers attach fresh vectors.
    pub fn search(&self, store: &Store, query: &[f32], k: usize) -> Result<Vec<(u64, f32)>> {
        if k == 0 {
            return Err(Error::InvalidK(k));
        }
        let Some(ep) = self.entry_point() else {
            return Ok(Vec::new());
        };

        let max_level = self.max_level();
        let mut cursor = ep;
        for lvl in (1..=max_level).rev() {
            let results = self.search_layer(store, query, cursor, lvl, 1)?;
            if let Some(best) = results.first() {
                cursor = best.id;
            }
        }

        let results = self.search_layer(store, query, cursor, 0, self.params.ef_search)?;
        Ok(results
            .into_iter()
            .take(k)
            .map(|c| (c.id, c.distance))
            .collect())
    }

    /// Removes `id` from the graph, unlinking it from every neighbor list
    /// that references it, and forwards the delete to the store. Does not
    /// repair topology beyond unlinking. Deleting an id the graph has never
    /// seen still forwards to the store and succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreCorruption`] or [`Error::Io`] if the store
    /// delete fails.
    pub fn delete(&self, store: &Store, id: u64) -> Result<()> {
        let mut nodes = self.nodes.write();
        if nodes.remove(&id).is_none() {
            drop(nodes);
            return store.delete(id);
        }

        for node in nodes.values_mut() {
            for level in &mut node.neighbors {
                if let Some(pos) = level.iter().position(|&n| n == id) {
                    level.swap_remove(pos);
                }
            }
        }

        if self.entry_point() == Some(id) {
            let new_entry = nodes
                .iter()
                .max_by_key(|(_, n)| n.top_level)
                .map(|(&nid, _)| nid);
            *self.entry_point.write() = new_entry;
            self.max_level.store(
                new_entry.map_or(-1, |nid| i64::from(nodes[&nid].top_level)),
                Ordering::Relaxed,
            );
        }

        if nodes.is_empty() {
            *self.entry_point.write() = None;
            self.max_level.store(-1, Ordering::Relaxed);
        }

        drop(nodes);
        store.delete(id)
    }

    /// Snapshots `(id, top_level, neighbors)` for every node, in arbitrary
    /// order, for sidecar serialization.
    pub(super) fn snapshot(&self) -> Vec<(u64, i32, Vec<Vec<u64>>)> {
        self.nodes
            .read()
            .iter()
            .map(|(&id, node)| (id, node.top_level, node.neighbors.clone()))
            .collect()
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
