//! Indexer configuration

use crate::{IndexError, Result};
use repoprint_hash::HashAlgorithm;
use serde::{Deserialize, Serialize};

/// Default number of files per leaf bucket
pub const DEFAULT_BUCKET_SIZE: usize = 256;

/// Default number of children aggregated per tree node
pub const DEFAULT_BRANCHING_FACTOR: usize = 4;

/// Default number of repositories indexed concurrently
pub const DEFAULT_WORKERS: usize = 8;

/// Configuration for an indexing session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Files per leaf bucket (B)
    pub bucket_size: usize,
    /// Children per tree node (F)
    pub branching_factor: usize,
    /// Stop building above this height
    pub max_height: Option<u32>,
    /// Algorithm the file hashes were produced with
    pub hash_algorithm: HashAlgorithm,
    /// Repositories indexed concurrently
    pub workers: usize,
    /// Re-index even when the document already exists
    pub force: bool,
    /// Index anyway when the existence check fails
    pub proceed_on_check_failure: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
            branching_factor: DEFAULT_BRANCHING_FACTOR,
            max_height: None,
            hash_algorithm: HashAlgorithm::default(),
            workers: DEFAULT_WORKERS,
            force: false,
            proceed_on_check_failure: true,
        }
    }
}

impl IndexerConfig {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.bucket_size == 0 {
            return Err(IndexError::InvalidConfig(
                "bucket_size must be positive".to_string(),
            ));
        }
        // A branching factor of one never reduces a layer
        if self.branching_factor < 2 {
            return Err(IndexError::InvalidConfig(
                "branching_factor must be at least 2".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(IndexError::InvalidConfig(
                "workers must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
