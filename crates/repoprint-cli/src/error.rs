//! Error types for the repoprint command line

use repoprint_core::IndexError;
use repoprint_hash::HashError;
use repoprint_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `CliError`
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors surfaced by a command
#[derive(Error, Debug)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("cannot read manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("invalid commit: {0}")]
    Commit(#[from] HashError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("no index for {0}")]
    NotFound(String),

    #[error("refusing to remove records without --yes")]
    NotConfirmed,

    #[error("{failed} of {total} repositories failed")]
    BatchFailed { failed: usize, total: usize },
}
