//! Bounded candidate max-heap.
//!
//! Used by HNSW's `search_layer` as its core working set; the same
//! add/peek/extract_top contract is what Flat and IVF conceptually perform
//! when merging per-candidate distances into a top-k result, though those
//! two simply sort a `Vec` since they don't need incremental pruning.

use crate::ordered_float::OrderedFloat;
use std::collections::BinaryHeap;

/// An id paired with its distance to some query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Identifier of the candidate.
    pub id: u64,
    /// Distance from the query.
    pub distance: f32,
}

/// A fixed-capacity max-heap of candidates, keyed on distance.
///
/// `add` rejects a candidate once the heap is full and the candidate is no
/// closer than the current worst; callers use the rejection as a pruning
/// signal during graph traversal.
pub struct CandidateHeap {
    capacity: usize,
    heap: BinaryHeap<(OrderedFloat, u64)>,
}

impl CandidateHeap {
    /// Creates an empty heap bounded at `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.min(1024)),
        }
    }

    /// Number of candidates currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if no candidates are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// True if the heap has reached its capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Returns the worst (largest-distance) candidate currently held.
    ///
    /// # Panics
    ///
    /// Panics if the heap is empty; callers must check `is_empty()` first,
    /// per the heap's contract of failing loudly rather than returning a
    /// sentinel candidate.
    #[must_use]
    pub fn peek(&self) -> Candidate {
        let &(d, id) = self.heap.peek().expect("peek on empty CandidateHeap");
        Candidate { id, distance: d.0 }
    }

    /// Attempts to add a candidate, enforcing the capacity bound.
    ///
    /// Returns `true` if the candidate was kept (either because the heap had
    /// room, or because it displaced the previous worst entry).
    pub fn add(&mut self, cand: Candidate) -> bool {
        if self.heap.len() < self.capacity {
            self.heap.push((OrderedFloat(cand.distance), cand.id));
            return true;
        }
        if !self.is_empty() && cand.distance < self.peek().distance {
            self.heap.pop();
            self.heap.push((OrderedFloat(cand.distance), cand.id));
            return true;
        }
        false
    }

    /// Drains the heap, returning the `k` best candidates ascending by
    /// distance. If `k` is at least the current length, the heap is emptied;
    /// otherwise the elements not returned remain in the heap.
    pub fn extract_top(&mut self, k: usize) -> Vec<Candidate> {
        let mut all: Vec<Candidate> = self
            .heap
            .drain()
            .map(|(d, id)| Candidate { id, distance: d.0 })
            .collect();
        all.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        if k >= all.len() {
            return all;
        }

        let rest = all.split_off(k);
        self.heap = rest
            .into_iter()
            .map(|c| (OrderedFloat(c.distance), c.id))
            .collect();
        all
    }
}
