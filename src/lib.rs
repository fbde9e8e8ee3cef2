//! # knndb
//!
//! An embedded approximate-nearest-neighbor vector database: fixed-dimension
//! `f32` vectors keyed by `u64` identifiers, persisted to a single regular
//! file, queried for k-nearest-neighbors under L2 (Euclidean) distance.
//!
//! Three interchangeable index strategies sit behind one uniform operation
//! set:
//!
//! - **Flat** ([`index::flat`]): exact brute-force search, no approximation.
//! - **HNSW** ([`index::hnsw`]): a hierarchical navigable small world graph.
//! - **IVF** ([`index::ivf`]): inverted-file clustering with multi-probe
//!   search.
//!
//! ## Quick start
//!
//! ```no_run
//! use knndb::{Database, DbConfig, IndexType};
//!
//! # fn main() -> knndb::Result<()> {
//! let config = DbConfig::new("/tmp/vectors.knn", 128, IndexType::Hnsw);
//! let db = Database::open(config)?;
//!
//! db.insert(1, &vec![0.0_f32; 128])?;
//! let results = db.search(&vec![0.0_f32; 128], 5)?;
//! db.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Scope
//!
//! This crate is the storage-and-search core: one data file, one fixed
//! dimension, one writer. It does not coordinate multi-process access, does
//! not offer crash-consistent (WAL-grade) durability beyond best-effort
//! `sync`, and does not repair HNSW graph topology on delete; see each
//! module's documentation for the specifics.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod distance;
pub mod error;
pub mod heap;
pub mod index;
pub mod ordered_float;
pub mod storage;
pub mod vector;

#[cfg(test)]
mod error_tests;

pub use config::{DbConfig, IndexType};
pub use error::{Error, Result};
pub use vector::{SearchResult, Vector, VectorId};

use index::flat::FlatIndex;
use index::hnsw::{self, Graph, HnswParams};
use index::ivf::{self, ClusterState, IvfParams};
use parking_lot::RwLock;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use storage::Store;
use tracing::{info, warn};

/// The active index engine, fixed at construction. A closed variant (per
/// the design notes' preference for inlining over vtable dispatch) rather
/// than a trait object.
enum IndexEngine {
    Flat(FlatIndex),
    Hnsw(Graph),
    Ivf(ClusterState),
}

/// The embedded vector database: one data file, one fixed dimension, one
/// engine, chosen at construction.
///
/// Holds a single coarse reader-writer lock guarding the engine's in-memory
/// structures (graph topology, cluster assignments, the flat id set);
/// `search`/`get`/`size` take it shared, `insert`/`delete`/`close` take it
/// exclusive. The store underneath has its own finer-grained lock (taken
/// only on a cache miss), so concurrent searches never contend with each
/// other on the hot read path.
pub struct Database {
    store: Store,
    engine: IndexEngine,
    dimension: usize,
    data_path: PathBuf,
    lock: RwLock<()>,
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

fn graph_sidecar_path(data_path: &Path) -> PathBuf {
    append_suffix(data_path, ".graph")
}

fn ivf_sidecar_path(data_path: &Path) -> PathBuf {
    append_suffix(data_path, ".ivf")
}

impl Database {
    /// Opens (creating if absent) a database at `config.data_path`.
    ///
    /// For HNSW and IVF, a sidecar present at the derived path
    /// (`<data_path>.graph` / `<data_path>.ivf`) is loaded and its
    /// parameters take precedence over `config`'s; if absent, a fresh
    /// engine is constructed from `config`'s parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` fails validation,
    /// [`Error::DimensionMismatch`] if a loaded HNSW sidecar's dimension
    /// disagrees with the store's, [`Error::GraphCorruption`] /
    /// [`Error::IvfCorruption`] if a sidecar fails to parse, or
    /// [`Error::Io`] on other filesystem faults.
    pub fn open(config: DbConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        let store = Store::open(
            &config.data_path,
            config.dimension,
            config.effective_cache_capacity(),
        )?;

        let engine = match config.index_type {
            IndexType::Flat => IndexEngine::Flat(FlatIndex::from_store(&store)),
            IndexType::Hnsw => {
                let sidecar_path = graph_sidecar_path(&config.data_path);
                if sidecar_path.exists() {
                    let (dim, graph) = hnsw::sidecar::load(&sidecar_path)?;
                    if dim as usize != config.dimension {
                        return Err(Error::DimensionMismatch {
                            expected: config.dimension,
                            actual: dim as usize,
                        });
                    }
                    IndexEngine::Hnsw(graph)
                } else {
                    IndexEngine::Hnsw(Graph::new(HnswParams {
                        m: config.m,
                        ef_construction: config.ef_construction,
                        ef_search: config.ef_search,
                        m_l: 1.0 / std::f64::consts::LN_2,
                    }))
                }
            }
            IndexType::Ivf => {
                let sidecar_path = ivf_sidecar_path(&config.data_path);
                if sidecar_path.exists() {
                    IndexEngine::Ivf(ivf::sidecar::load(&sidecar_path)?)
                } else {
                    IndexEngine::Ivf(ClusterState::new(IvfParams {
                        n_clusters: config.n_clusters,
                        n_probe: config.n_probe,
                    }))
                }
            }
        };

        info!(
            path = %config.data_path.display(),
            index_type = ?config.index_type,
            dimension = config.dimension,
            "database opened"
        );

        Ok(Self {
            store,
            engine,
            dimension: config.dimension,
            data_path: config.data_path,
            lock: RwLock::new(()),
        })
    }

    /// Inserts or overwrites the vector stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `vector.len()` doesn't match
    /// the configured dimension, or an engine/store error otherwise.
    pub fn insert(&self, id: u64, vector: &[f32]) -> Result<()> {
        let _guard = self.lock.write();
        self.check_dimension(vector.len())?;

        match &self.engine {
            IndexEngine::Flat(idx) => idx.insert(&self.store, id, vector),
            IndexEngine::Hnsw(graph) => graph.insert(&self.store, id, vector),
            IndexEngine::Ivf(state) => state.insert(&self.store, id, vector),
        }
    }

    /// Returns the `k` nearest neighbors of `query`, best-first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `query.len()` doesn't match
    /// the configured dimension, or [`Error::InvalidK`] if `k == 0`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let _guard = self.lock.read();
        self.check_dimension(query.len())?;
        if k == 0 {
            return Err(Error::InvalidK(k));
        }

        match &self.engine {
            IndexEngine::Flat(idx) => idx.search(&self.store, query, k),
            IndexEngine::Hnsw(graph) => {
                let hits = graph.search(&self.store, query, k)?;
                let mut results = Vec::with_capacity(hits.len());
                for (id, distance) in hits {
                    match self.store.read(id) {
                        Ok(Some(vector)) => results.push(SearchResult { id, distance, vector }),
                        Ok(None) => {}
                        Err(e) => {
                            warn!(id, error = %e, "hnsw search: skipping unreadable result");
                        }
                    }
                }
                Ok(results)
            }
            IndexEngine::Ivf(state) => state.search(&self.store, query, k),
        }
    }

    /// Reads back the vector stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `id` is not present.
    pub fn get(&self, id: u64) -> Result<Vector> {
        let _guard = self.lock.read();
        self.store.read(id)?.ok_or(Error::NotFound(id))
    }

    /// Deletes `id`. Deleting an id that was never inserted is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an engine/store error on I/O or corruption.
    pub fn delete(&self, id: u64) -> Result<()> {
        let _guard = self.lock.write();

        match &self.engine {
            IndexEngine::Flat(idx) => idx.delete(&self.store, id),
            IndexEngine::Hnsw(graph) => graph.delete(&self.store, id),
            IndexEngine::Ivf(state) => state.delete(&self.store, id),
        }
    }

    /// Number of live ids currently stored.
    #[must_use]
    pub fn size(&self) -> usize {
        let _guard = self.lock.read();

        match &self.engine {
            IndexEngine::Flat(idx) => idx.size(),
            IndexEngine::Hnsw(graph) => graph.len(),
            IndexEngine::Ivf(state) => state.size(),
        }
    }

    /// Saves the engine's sidecar (HNSW/IVF only; Flat has none), then
    /// compacts and closes the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreCompactFailed`] or [`Error::StoreFooterFailed`]
    /// from the store close, or an I/O error from the sidecar save.
    pub fn close(self) -> Result<()> {
        let Self {
            store,
            engine,
            dimension,
            data_path,
            lock: _,
        } = self;

        match &engine {
            IndexEngine::Hnsw(graph) => {
                #[allow(clippy::cast_possible_truncation)]
                hnsw::sidecar::save(graph_sidecar_path(&data_path), dimension as u32, graph)?;
            }
            IndexEngine::Ivf(state) => {
                ivf::sidecar::save(ivf_sidecar_path(&data_path), state)?;
            }
            IndexEngine::Flat(_) => {}
        }

        store.close()
    }

    fn check_dimension(&self, len: usize) -> Result<()> {
        if len != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: len,
            });
        }
        Ok(())
    }
}
