//! Error types for `knndb`.
//!
//! One enum covers every fallible operation across the store and the three
//! index engines. Per-id read failures inside a multi-id scan (Flat/IVF
//! search, HNSW neighbor reads) are logged and skipped rather than
//! propagated; see the call sites in `index::flat`, `index::hnsw`, and
//! `index::ivf` for the partial-result contract.

use thiserror::Error;

/// Result type alias for `knndb` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in `knndb` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Input vector length did not match the configured dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Length of the offending vector.
        actual: usize,
    },

    /// `search` was called with `k == 0`.
    #[error("invalid k: {0} (must be > 0)")]
    InvalidK(usize),

    /// `get` was called on an id that is not present.
    #[error("id {0} not found")]
    NotFound(u64),

    /// A constructor received an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The record at an indexed offset did not carry the expected id.
    #[error("store corruption: {0}")]
    StoreCorruption(String),

    /// The HNSW graph sidecar failed validation (magic, version, or framing).
    #[error("hnsw graph corruption: {0}")]
    GraphCorruption(String),

    /// The IVF sidecar failed validation (magic, version, or framing).
    #[error("ivf sidecar corruption: {0}")]
    IvfCorruption(String),

    /// Compaction failed while closing the store; the underlying cause is wrapped.
    #[error("store compaction failed: {0}")]
    StoreCompactFailed(#[source] std::io::Error),

    /// The footer failed to write after a successful compaction.
    #[error("store footer write failed: {0}")]
    StoreFooterFailed(#[source] std::io::Error),

    /// Any other filesystem fault, wrapped with context.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true for errors a caller can plausibly recover from by
    /// retrying with different input, as opposed to corruption that
    /// indicates the on-disk state itself needs to be rebuilt.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::StoreCorruption(_) | Self::GraphCorruption(_) | Self::IvfCorruption(_)
        )
    }
}
