//! The HNSW (Hierarchical Navigable Small World) graph engine.
//!
//! A multi-layer proximity graph: an xorshift64 level-sampling PRNG and a
//! bounded best-first `search_layer`, keyed by a sparse `HashMap<u64, Node>`
//! since graph nodes here are caller-chosen ids with their vectors living
//! in the [`crate::storage::Store`], not inline.
//!
//! - [`graph`]: [`Graph`], the layered adjacency structure, insert, search,
//!   delete.
//! - [`sidecar`]: the `<data_path>.graph` binary format, one full snapshot
//!   per save.

mod graph;
pub mod sidecar;

pub use graph::{Graph, HnswParams};
