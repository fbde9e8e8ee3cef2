//! Database configuration.
//!
//! Carries exactly the options the constructor recognizes: no file format,
//! no environment variables, no layered overrides; those are out of scope
//! here (see the crate's design notes on configuration defaults being an
//! external collaborator, not part of this core).

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A field failed validation.
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },
}

/// Which index engine backs the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// Exact brute-force search over the store.
    Flat,
    /// Hierarchical Navigable Small World graph.
    Hnsw,
    /// Inverted-file clustering.
    Ivf,
}

/// Constructor configuration for a [`crate::Database`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the single data file.
    pub data_path: PathBuf,
    /// Fixed vector dimension `D`.
    pub dimension: usize,
    /// Which engine to use.
    pub index_type: IndexType,
    /// LRU vector cache capacity. Negative means "use the default (1000)",
    /// zero disables caching.
    pub cache_capacity: i32,
    /// HNSW target out-degree per node.
    pub m: usize,
    /// HNSW construction-time beam width.
    pub ef_construction: usize,
    /// HNSW search-time beam width.
    pub ef_search: usize,
    /// IVF target cluster count.
    pub n_clusters: usize,
    /// IVF number of clusters probed per search.
    pub n_probe: usize,
}

impl DbConfig {
    /// Default HNSW out-degree.
    pub const DEFAULT_M: usize = 16;
    /// Default HNSW construction beam width.
    pub const DEFAULT_EF_CONSTRUCTION: usize = 200;
    /// Default HNSW search beam width.
    pub const DEFAULT_EF_SEARCH: usize = 50;
    /// Default IVF cluster count.
    pub const DEFAULT_N_CLUSTERS: usize = 100;
    /// Default IVF probe count.
    pub const DEFAULT_N_PROBE: usize = 1;
    /// Effective cache capacity used when `cache_capacity` is negative.
    pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

    /// Creates a configuration for a Flat index with otherwise default
    /// parameters.
    #[must_use]
    pub fn new(data_path: impl Into<PathBuf>, dimension: usize, index_type: IndexType) -> Self {
        Self {
            data_path: data_path.into(),
            dimension,
            index_type,
            cache_capacity: -1,
            m: Self::DEFAULT_M,
            ef_construction: Self::DEFAULT_EF_CONSTRUCTION,
            ef_search: Self::DEFAULT_EF_SEARCH,
            n_clusters: Self::DEFAULT_N_CLUSTERS,
            n_probe: Self::DEFAULT_N_PROBE,
        }
    }

    /// Resolves `cache_capacity` into an effective, non-negative capacity.
    #[must_use]
    pub fn effective_cache_capacity(&self) -> usize {
        if self.cache_capacity < 0 {
            Self::DEFAULT_CACHE_CAPACITY
        } else {
            self.cache_capacity as usize
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a non-positive dimension,
    /// or non-positive IVF cluster/probe counts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension == 0 {
            return Err(ConfigError::InvalidValue {
                key: "dimension".to_string(),
                message: "must be >= 1".to_string(),
            });
        }

        if self.m == 0 {
            return Err(ConfigError::InvalidValue {
                key: "m".to_string(),
                message: "must be >= 1".to_string(),
            });
        }

        if self.ef_construction == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ef_construction".to_string(),
                message: "must be >= 1".to_string(),
            });
        }

        if self.ef_search == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ef_search".to_string(),
                message: "must be >= 1".to_string(),
            });
        }

        if matches!(self.index_type, IndexType::Ivf) {
            if self.n_clusters == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "n_clusters".to_string(),
                    message: "must be >= 1".to_string(),
                });
            }
            if self.n_probe == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "n_probe".to_string(),
                    message: "must be >= 1".to_string(),
                });
            }
        }

        Ok(())
    }
}
