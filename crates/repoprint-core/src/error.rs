//! Error types for the repoprint-core crate

use repoprint_store::StoreError;
use std::fmt;
use thiserror::Error;

/// Result type alias using `IndexError`
pub type Result<T> = std::result::Result<T, IndexError>;

/// The caller's input is malformed; retrying it unchanged cannot succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The same path appears twice
    #[error("duplicate path: {0}")]
    DuplicatePath(String),

    /// Paths are not in ascending order
    #[error("files not sorted by path: {previous:?} precedes {current:?}")]
    Unsorted { previous: String, current: String },

    /// A file record has an empty path
    #[error("empty path at position {index}")]
    EmptyPath { index: usize },

    /// A content hash does not have the algorithm's width
    #[error("hash for {path} must be {expected} bytes, got {actual}")]
    HashWidth {
        path: String,
        expected: usize,
        actual: usize,
    },

    /// Commit hash is neither a SHA-1 nor a SHA-256 object id
    #[error("commit hash must be 20 or 32 bytes, got {0}")]
    CommitWidth(usize),

    /// Repository address is empty
    #[error("repository address is empty")]
    EmptyAddress,
}

/// Errors that can occur while indexing a repository
#[derive(Error, Debug)]
pub enum IndexError {
    /// Input failed validation
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Preparation could not hash a file
    #[error("hash computation failed for {path}: {reason}")]
    HashComputation { path: String, reason: String },

    /// Backing store hiccup; resubmitting may succeed
    #[error("transient store error: {0}")]
    TransientStore(StoreError),

    /// Transaction failed to commit; nothing was written
    #[error("store error: {0}")]
    Store(StoreError),

    /// Dedup probe failed for a non-transient reason
    #[error("existence check failed: {0}")]
    ExistenceCheck(StoreError),

    /// Stored record could not be decoded
    #[error("corrupt record {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    /// The worker running this repository stopped before finishing
    #[error("indexing task interrupted: {0}")]
    Interrupted(String),

    /// Indexer configuration is unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IndexError {
    /// Whether resubmitting the same repository may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            IndexError::TransientStore(_) | IndexError::Store(_) | IndexError::Interrupted(_) => {
                true
            }
            IndexError::ExistenceCheck(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<StoreError> for IndexError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            IndexError::TransientStore(err)
        } else {
            IndexError::Store(err)
        }
    }
}

/// Pipeline stage a repository failed in.
///
/// Bucketing and tree construction run on validated input and cannot fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Validate,
    ExistenceCheck,
    Persist,
    /// Waiting for or running in a worker slot
    Queue,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Validate => "validate",
            Stage::ExistenceCheck => "existence-check",
            Stage::Persist => "persist",
            Stage::Queue => "queue",
        })
    }
}

/// A failure scoped to one repository
#[derive(Error, Debug)]
#[error("{stage} failed for {address}@{commit}: {error}")]
pub struct RepoFailure {
    pub address: String,
    pub commit: String,
    pub stage: Stage,
    #[source]
    pub error: IndexError,
}

impl RepoFailure {
    /// Whether resubmitting the repository may succeed
    pub fn is_retryable(&self) -> bool {
        self.error.is_retryable()
    }
}
