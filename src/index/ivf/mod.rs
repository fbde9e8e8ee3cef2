//! The IVF (Inverted File) clustering engine.
//!
//! Partitions the vector space into a bounded number of clusters, each
//! represented by a centroid record stored under the reserved descending id
//! range (see [`crate::vector::centroid_id`]); search probes only the
//! closest few clusters instead of scanning every vector.
//!
//! - [`cluster`]: [`ClusterState`], bootstrap-then-assign insert,
//!   multi-probe search, incremental centroid update, delete-and-recenter.
//! - [`sidecar`]: the `<data_path>.ivf` binary format.

mod cluster;
pub mod sidecar;

pub use cluster::{ClusterState, IvfParams};
