//! Error types for the repoprint-store crate

use thiserror::Error;

/// Result type alias using `StoreError`
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during backing store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backing store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Operation exceeded the store's deadline
    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Transaction lost a conflict with a concurrent writer
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// Transaction was rejected and nothing was applied
    #[error("transaction aborted: {0}")]
    Aborted(String),

    /// Malformed key
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether resubmitting the same operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::Timeout { .. } | StoreError::Conflict(_)
        )
    }
}

impl From<serde_ipld_dagcbor::DecodeError<std::convert::Infallible>> for StoreError {
    fn from(err: serde_ipld_dagcbor::DecodeError<std::convert::Infallible>) -> Self {
        StoreError::Deserialization(err.to_string())
    }
}
