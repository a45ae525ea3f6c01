//! # Repoprint Store
//!
//! Backing store layer for repoprint fingerprint indexes.
//!
//! This crate provides:
//! - **Keys**: `(kind, name)` pairs scoped under a parent key
//! - **Transactions**: ordered operation batches applied atomically
//! - **Queries**: point lookups, ancestor queries and per-kind prefix scans
//! - **Memory engine**: an ordered in-process store with snapshot files
//! - **Bulk removal**: throttled, partitioned deletion of a whole record kind
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Indexer / Matcher              │
//! ├─────────────────────────────────────────┤
//! │          IndexStore Trait               │
//! ├────────────────────┬────────────────────┤
//! │  MemoryIndexStore  │ FaultInjectingStore│
//! └────────────────────┴────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use repoprint_store::{IndexStore, Key, Kind, MemoryIndexStore, Transaction};
//!
//! let store = MemoryIndexStore::new();
//! let doc = Key::named(Kind::Document, "https://example.com/repo-MD5-00ff");
//! let mut tx = Transaction::new();
//! tx.put(doc.clone(), b"header".to_vec());
//! store.commit(tx).await?;
//! assert!(store.has(&doc).await?);
//! ```

pub mod error;
pub mod fault;
pub mod key;
pub mod memory;
pub mod record;
pub mod remover;
pub mod tx;

pub use error::{Result, StoreError};
pub use fault::FaultInjectingStore;
pub use key::{Key, Kind};
pub use memory::MemoryIndexStore;
pub use record::{decode_record, encode_record};
pub use remover::{BulkRemover, RemoverConfig};
pub use tx::{Operation, Transaction};

use async_trait::async_trait;
use bytes::Bytes;

/// A stored record together with its key
pub type Entry = (Key, Bytes);

/// Trait for transactional keyed backing stores
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Retrieve a record by key
    async fn get(&self, key: &Key) -> Result<Option<Bytes>>;

    /// Check if a record exists
    async fn has(&self, key: &Key) -> Result<bool>;

    /// Apply every operation in `tx` atomically
    async fn commit(&self, tx: Transaction) -> Result<()>;

    /// Records nested under `parent`, optionally restricted to one kind,
    /// in key order
    async fn descendants(&self, parent: &Key, kind: Option<Kind>) -> Result<Vec<Entry>>;

    /// Records of `kind` across all parents whose name starts with
    /// `name_prefix`, ordered by name
    async fn scan(&self, kind: Kind, name_prefix: &str, limit: Option<usize>)
        -> Result<Vec<Entry>>;

    /// Keys-only variant of [`IndexStore::scan`]
    async fn keys(&self, kind: Kind, name_prefix: &str) -> Result<Vec<Key>>;

    /// Delete a batch of keys outside any transaction, returning how many
    /// existed
    async fn delete_many(&self, keys: &[Key]) -> Result<usize>;
}

#[async_trait]
impl<S: IndexStore + ?Sized> IndexStore for std::sync::Arc<S> {
    async fn get(&self, key: &Key) -> Result<Option<Bytes>> {
        (**self).get(key).await
    }

    async fn has(&self, key: &Key) -> Result<bool> {
        (**self).has(key).await
    }

    async fn commit(&self, tx: Transaction) -> Result<()> {
        (**self).commit(tx).await
    }

    async fn descendants(&self, parent: &Key, kind: Option<Kind>) -> Result<Vec<Entry>> {
        (**self).descendants(parent, kind).await
    }

    async fn scan(
        &self,
        kind: Kind,
        name_prefix: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Entry>> {
        (**self).scan(kind, name_prefix, limit).await
    }

    async fn keys(&self, kind: Kind, name_prefix: &str) -> Result<Vec<Key>> {
        (**self).keys(kind, name_prefix).await
    }

    async fn delete_many(&self, keys: &[Key]) -> Result<usize> {
        (**self).delete_many(keys).await
    }
}
