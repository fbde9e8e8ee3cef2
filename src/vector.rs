//! Core vector types shared by the store and every index engine.

/// A fixed-dimension real vector.
pub type Vector = Vec<f32>;

/// 64-bit identifier for a stored vector.
pub type VectorId = u64;

/// Sentinel id marking a tombstoned record.
pub const DELETED: VectorId = u64::MAX;

/// Returns the reserved centroid-record id for IVF cluster index `i`.
///
/// Chosen as `DELETED - 1 - i` rather than `DELETED - i` so the centroid
/// range never collides with the tombstone sentinel at cluster 0 (see
/// Open Question 3 in the design notes).
#[must_use]
pub const fn centroid_id(i: usize) -> VectorId {
    DELETED - 1 - i as u64
}

/// A single ranked result from a nearest-neighbor search, returned best-first.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Identifier of the matched vector.
    pub id: VectorId,
    /// L2 distance from the query.
    pub distance: f32,
    /// Owned copy of the matched vector.
    pub vector: Vector,
}
