//! Store wrapper with injectable failures and call accounting
//!
//! Used to exercise the retry, isolation and round-trip guarantees of code
//! layered on an [`IndexStore`] without a real flaky backend.

use crate::{Entry, IndexStore, Key, Kind, Result, StoreError, Transaction};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

/// Wraps any store and fails selected operations on demand
pub struct FaultInjectingStore<S: IndexStore> {
    inner: S,
    /// Root key names whose commits are rejected
    failing_roots: Mutex<HashSet<String>>,
    /// Remaining point reads to fail
    failing_reads: AtomicUsize,
    reads: AtomicUsize,
    commits: AtomicUsize,
}

impl<S: IndexStore> FaultInjectingStore<S> {
    /// Wrap `inner` with no faults armed
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing_roots: Mutex::new(HashSet::new()),
            failing_reads: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
        }
    }

    /// Reject every commit touching a key under the root named `name`
    pub fn fail_commits_for(&self, name: impl Into<String>) {
        self.failing_roots.lock().insert(name.into());
    }

    /// Stop rejecting commits for `name`
    pub fn heal_commits_for(&self, name: &str) {
        self.failing_roots.lock().remove(name);
    }

    /// Fail the next `count` point reads with [`StoreError::Unavailable`]
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Number of point reads (`get`/`has`) that reached this wrapper
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of commits attempted
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Get the wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check_read(&self) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let armed = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: IndexStore> IndexStore for FaultInjectingStore<S> {
    async fn get(&self, key: &Key) -> Result<Option<Bytes>> {
        self.check_read()?;
        self.inner.get(key).await
    }

    async fn has(&self, key: &Key) -> Result<bool> {
        self.check_read()?;
        self.inner.has(key).await
    }

    async fn commit(&self, tx: Transaction) -> Result<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        let poisoned = {
            let roots = self.failing_roots.lock();
            tx.iter()
                .map(|op| op.key().root().name().to_string())
                .find(|name| roots.contains(name))
        };
        if let Some(name) = poisoned {
            warn!(root = %name, "rejecting commit");
            return Err(StoreError::Aborted(format!("injected commit failure for {}", name)));
        }
        self.inner.commit(tx).await
    }

    async fn descendants(&self, parent: &Key, kind: Option<Kind>) -> Result<Vec<Entry>> {
        self.inner.descendants(parent, kind).await
    }

    async fn scan(
        &self,
        kind: Kind,
        name_prefix: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Entry>> {
        self.inner.scan(kind, name_prefix, limit).await
    }

    async fn keys(&self, kind: Kind, name_prefix: &str) -> Result<Vec<Key>> {
        self.inner.keys(kind, name_prefix).await
    }

    async fn delete_many(&self, keys: &[Key]) -> Result<usize> {
        self.inner.delete_many(keys).await
    }
}
