//! In-memory index store with snapshot files

use crate::{Entry, IndexStore, Key, Kind, Operation, Result, StoreError, Transaction};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Snapshot file format version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Default)]
struct Tables {
    /// Encoded path -> (key, value)
    records: BTreeMap<String, (Key, Bytes)>,
    /// (kind, name, encoded path) for per-kind scans
    by_kind: BTreeSet<(Kind, String, String)>,
}

impl Tables {
    fn insert(&mut self, key: Key, value: Bytes) {
        let path = key.encode();
        self.by_kind
            .insert((key.kind(), key.name().to_string(), path.clone()));
        self.records.insert(path, (key, value));
    }

    fn remove(&mut self, key: &Key) -> bool {
        let path = key.encode();
        match self.records.remove(&path) {
            Some(_) => {
                self.by_kind
                    .remove(&(key.kind(), key.name().to_string(), path));
                true
            }
            None => false,
        }
    }

    fn descendant_keys(&self, parent: &Key) -> Vec<Key> {
        let prefix = parent.descendant_prefix();
        self.records
            .range::<String, _>((Bound::Included(&prefix), Bound::Unbounded))
            .take_while(|(path, _)| path.starts_with(&prefix))
            .map(|(_, (key, _))| key.clone())
            .collect()
    }

    fn kind_paths<'a>(&'a self, kind: Kind, name_prefix: &'a str) -> impl Iterator<Item = &'a str> {
        let start = (kind, name_prefix.to_string(), String::new());
        self.by_kind
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(move |(k, name, _)| *k == kind && name.starts_with(name_prefix))
            .map(|(_, _, path)| path.as_str())
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: Vec<SnapshotEntry>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    path: String,
    #[serde(with = "serde_bytes")]
    value: Vec<u8>,
}

/// An ordered in-memory store.
///
/// Commits take the write lock once, so readers observe either none or all
/// of a transaction. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryIndexStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryIndexStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of records stored
    pub fn len(&self) -> usize {
        self.tables.read().records.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.tables.read().records.is_empty()
    }

    /// Count records of one kind
    pub fn count(&self, kind: Kind) -> usize {
        self.tables.read().kind_paths(kind, "").count()
    }

    /// Clear all records
    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.records.clear();
        tables.by_kind.clear();
    }

    /// Write every record to a snapshot file, returning the record count
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<usize> {
        let snapshot = {
            let tables = self.tables.read();
            Snapshot {
                version: SNAPSHOT_VERSION,
                entries: tables
                    .records
                    .iter()
                    .map(|(path, (_, value))| SnapshotEntry {
                        path: path.clone(),
                        value: value.to_vec(),
                    })
                    .collect(),
            }
        };
        let count = snapshot.entries.len();
        let bytes = serde_ipld_dagcbor::to_vec(&snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        tokio::fs::write(path.as_ref(), bytes).await?;
        debug!(records = count, "snapshot saved");
        Ok(count)
    }

    /// Load a store from a snapshot file
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        let snapshot: Snapshot = serde_ipld_dagcbor::from_slice(&bytes)
            .map_err(|e| StoreError::Deserialization(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::Deserialization(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let store = Self::new();
        {
            let mut tables = store.tables.write();
            for entry in snapshot.entries {
                let key = Key::decode(&entry.path)?;
                tables.insert(key, Bytes::from(entry.value));
            }
        }
        debug!(records = store.len(), "snapshot loaded");
        Ok(store)
    }

    /// Load a snapshot if the file exists, otherwise start empty
    pub async fn open_or_new(path: impl AsRef<Path>) -> Result<Self> {
        match tokio::fs::try_exists(path.as_ref()).await? {
            true => Self::load_snapshot(path).await,
            false => Ok(Self::new()),
        }
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn get(&self, key: &Key) -> Result<Option<Bytes>> {
        Ok(self
            .tables
            .read()
            .records
            .get(&key.encode())
            .map(|(_, value)| value.clone()))
    }

    async fn has(&self, key: &Key) -> Result<bool> {
        Ok(self.tables.read().records.contains_key(&key.encode()))
    }

    #[instrument(skip(self, tx), fields(ops = tx.len()))]
    async fn commit(&self, tx: Transaction) -> Result<()> {
        // Reject the whole batch before touching any table
        for op in tx.iter() {
            op.key()
                .validate()
                .map_err(|e| StoreError::Aborted(e.to_string()))?;
        }

        let mut tables = self.tables.write();
        for op in tx {
            match op {
                Operation::Put { key, value } => tables.insert(key, value),
                Operation::Delete { key } => {
                    tables.remove(&key);
                }
                Operation::DeleteDescendants { parent } => {
                    for key in tables.descendant_keys(&parent) {
                        tables.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    async fn descendants(&self, parent: &Key, kind: Option<Kind>) -> Result<Vec<Entry>> {
        let tables = self.tables.read();
        let prefix = parent.descendant_prefix();
        Ok(tables
            .records
            .range::<String, _>((Bound::Included(&prefix), Bound::Unbounded))
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(_, (key, _))| kind.map_or(true, |k| key.kind() == k))
            .map(|(_, (key, value))| (key.clone(), value.clone()))
            .collect())
    }

    async fn scan(
        &self,
        kind: Kind,
        name_prefix: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Entry>> {
        let tables = self.tables.read();
        Ok(tables
            .kind_paths(kind, name_prefix)
            .take(limit.unwrap_or(usize::MAX))
            .filter_map(|path| tables.records.get(path))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn keys(&self, kind: Kind, name_prefix: &str) -> Result<Vec<Key>> {
        let tables = self.tables.read();
        Ok(tables
            .kind_paths(kind, name_prefix)
            .filter_map(|path| tables.records.get(path))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn delete_many(&self, keys: &[Key]) -> Result<usize> {
        let mut tables = self.tables.write();
        Ok(keys.iter().filter(|key| tables.remove(key)).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> Key {
        Key::named(Kind::Document, name)
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryIndexStore::new();
        let key = doc("repo-MD5-01");

        let mut tx = Transaction::new();
        tx.put(key.clone(), Bytes::from_static(b"header"));
        store.commit(tx).await.unwrap();

        assert!(store.has(&key).await.unwrap());
        assert_eq!(
            store.get(&key).await.unwrap(),
            Some(Bytes::from_static(b"header"))
        );
        assert_eq!(store.get(&doc("missing")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_key_aborts_whole_transaction() {
        let store = MemoryIndexStore::new();
        let mut tx = Transaction::new();
        tx.put(doc("good"), Bytes::from_static(b"a"));
        tx.put(doc(""), Bytes::from_static(b"b"));

        let result = store.commit(tx).await;
        assert!(matches!(result, Err(StoreError::Aborted(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_descendants_are_scoped() {
        let store = MemoryIndexStore::new();
        let a = doc("a");
        let ab = doc("ab");

        let mut tx = Transaction::new();
        tx.put(a.clone(), Bytes::new());
        tx.put(ab.clone(), Bytes::new());
        tx.put(Key::child(&a, Kind::TreeNode, "01"), Bytes::new());
        tx.put(Key::child(&a, Kind::BucketResult, "02"), Bytes::new());
        tx.put(Key::child(&ab, Kind::TreeNode, "03"), Bytes::new());
        store.commit(tx).await.unwrap();

        assert_eq!(store.descendants(&a, None).await.unwrap().len(), 2);
        let nodes = store.descendants(&a, Some(Kind::TreeNode)).await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].0.name(), "01");
    }

    #[tokio::test]
    async fn test_delete_descendants_then_put_replaces() {
        let store = MemoryIndexStore::new();
        let parent = doc("repo");

        let mut tx = Transaction::new();
        tx.put(parent.clone(), Bytes::from_static(b"v1"));
        tx.put(Key::child(&parent, Kind::TreeNode, "old"), Bytes::new());
        store.commit(tx).await.unwrap();

        let mut tx = Transaction::new();
        tx.delete_descendants(parent.clone());
        tx.put(parent.clone(), Bytes::from_static(b"v2"));
        tx.put(Key::child(&parent, Kind::TreeNode, "new"), Bytes::new());
        store.commit(tx).await.unwrap();

        let children = store.descendants(&parent, None).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].0.name(), "new");
        assert_eq!(store.count(Kind::TreeNode), 1);
        assert_eq!(
            store.get(&parent).await.unwrap(),
            Some(Bytes::from_static(b"v2"))
        );
    }

    #[tokio::test]
    async fn test_scan_by_kind_and_prefix() {
        let store = MemoryIndexStore::new();
        let mut tx = Transaction::new();
        for (parent, name) in [("r1", "aa-MD5-2-1"), ("r2", "aa-MD5-2-1"), ("r1", "ab-MD5-1-1")] {
            tx.put(Key::child(&doc(parent), Kind::TreeNode, name), Bytes::new());
        }
        tx.put(Key::child(&doc("r1"), Kind::BucketResult, "aa-MD5"), Bytes::new());
        store.commit(tx).await.unwrap();

        let same_hash = store.scan(Kind::TreeNode, "aa-", None).await.unwrap();
        assert_eq!(same_hash.len(), 2);
        let parents: Vec<_> = same_hash
            .iter()
            .map(|(k, _)| k.parent().unwrap().name().to_string())
            .collect();
        assert_eq!(parents, vec!["r1", "r2"]);

        assert_eq!(store.scan(Kind::TreeNode, "a", Some(1)).await.unwrap().len(), 1);
        assert_eq!(store.keys(Kind::TreeNode, "").await.unwrap().len(), 3);
        assert_eq!(store.keys(Kind::BucketResult, "").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_many_counts_existing() {
        let store = MemoryIndexStore::new();
        let mut tx = Transaction::new();
        tx.put(doc("a"), Bytes::new());
        tx.put(doc("b"), Bytes::new());
        store.commit(tx).await.unwrap();

        let deleted = store
            .delete_many(&[doc("a"), doc("missing")])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.count(Kind::Document), 1);
    }

    #[tokio::test]
    async fn test_snapshot_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.snapshot");

        let store = MemoryIndexStore::new();
        let parent = doc("https://github.com/org/repo-MD5-ff");
        let mut tx = Transaction::new();
        tx.put(parent.clone(), Bytes::from_static(b"header"));
        tx.put(Key::child(&parent, Kind::TreeNode, "01-MD5-2-1"), Bytes::from_static(b"node"));
        store.commit(tx).await.unwrap();
        assert_eq!(store.save_snapshot(&path).await.unwrap(), 2);

        let loaded = MemoryIndexStore::load_snapshot(&path).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.count(Kind::TreeNode), 1);
        assert_eq!(
            loaded.get(&parent).await.unwrap(),
            Some(Bytes::from_static(b"header"))
        );
    }

    #[tokio::test]
    async fn test_open_or_new_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryIndexStore::open_or_new(dir.path().join("absent"))
            .await
            .unwrap();
        assert!(store.is_empty());
    }
}
