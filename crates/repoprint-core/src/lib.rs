//! # Repoprint Core
//!
//! Indexing engine for repository fingerprints.
//!
//! This crate provides:
//! - **Bucketing**: path-ordered file hashes grouped into fixed-size leaf buckets
//! - **Tree construction**: buckets aggregated layer by layer into a hash tree
//! - **Deduplication**: a session memo in front of the store's existence check
//! - **Persistence**: one atomic transaction per repository and commit
//! - **Reading**: document lookups and cross-document node queries for matchers
//! - **Sessions**: a bounded worker pool indexing many repositories at once
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            IndexSession                 │
//! ├─────────────────────────────────────────┤
//! │  Bucketer → TreeBuilder → DedupCache    │
//! │                         → Persister     │
//! ├─────────────────────────────────────────┤
//! │     IndexStore (repoprint-store)        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use repoprint_core::{IndexSession, IndexerConfig};
//! use repoprint_store::MemoryIndexStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryIndexStore::new());
//! let session = Arc::new(IndexSession::new(store, IndexerConfig::default())?);
//! let report = session.index_all(prepared_repos).await;
//! assert!(report.is_success());
//! ```

pub mod bucket;
pub mod config;
pub mod dedup;
pub mod error;
pub mod keys;
pub mod model;
pub mod persist;
pub mod reader;
pub mod session;
pub mod tree;

pub use bucket::{Bucket, Bucketer};
pub use config::IndexerConfig;
pub use dedup::DedupCache;
pub use error::{IndexError, RepoFailure, Result, Stage, ValidationError};
pub use model::{
    BucketResult, FileRecord, PreparedRepo, RepoIndexDocument, RepoInfo, TreeNodeRecord,
    UnreadableFile,
};
pub use persist::{Persister, StoreSummary};
pub use reader::{IndexReader, Owned};
pub use session::{BatchReport, IndexOutcome, IndexSession};
pub use tree::{TreeBuilder, TreeLayers, TreeNode};
