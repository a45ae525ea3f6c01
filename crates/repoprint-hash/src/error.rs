//! Error types for the repoprint-hash crate

use thiserror::Error;

/// Result type alias using `HashError`
pub type Result<T> = std::result::Result<T, HashError>;

/// Errors that can occur while parsing or validating digests
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Hex decoding failed
    #[error("invalid hex digest: {0}")]
    InvalidHex(String),

    /// Digest width does not match the algorithm
    #[error("{algorithm} digest must be {expected} bytes, got {actual}")]
    WidthMismatch {
        algorithm: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Unknown algorithm identifier
    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),
}

impl From<hex::FromHexError> for HashError {
    fn from(err: hex::FromHexError) -> Self {
        HashError::InvalidHex(err.to_string())
    }
}
