//! Session-scoped deduplication of already indexed commits

use crate::keys::document_key;
use crate::{IndexError, Result};
use dashmap::DashSet;
use repoprint_hash::{Digest, HashAlgorithm};
use repoprint_store::{IndexStore, Key};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Insert-only memo in front of the backing store's existence check.
///
/// A positive answer is remembered for the lifetime of the cache, so repeated
/// checks for the same triple cost one store round trip at most. Negative
/// answers are never cached, since another worker may store the document
/// later in the session.
pub struct DedupCache<S: IndexStore> {
    store: Arc<S>,
    seen: DashSet<String>,
}

impl<S: IndexStore> DedupCache<S> {
    /// Create an empty cache over `store`
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            seen: DashSet::new(),
        }
    }

    /// Check if the document for `(address, algorithm, commit)` exists
    #[instrument(skip(self, commit), fields(commit = %commit))]
    pub async fn exists(
        &self,
        address: &str,
        algorithm: HashAlgorithm,
        commit: &Digest,
    ) -> Result<bool> {
        let key = document_key(address, algorithm, commit);
        if self.seen.contains(key.name()) {
            return Ok(true);
        }

        let found = self.store.has(&key).await.map_err(|e| {
            if e.is_transient() {
                IndexError::TransientStore(e)
            } else {
                IndexError::ExistenceCheck(e)
            }
        })?;
        if found {
            debug!(document = key.name(), "document already stored");
            self.seen.insert(key.name().to_string());
        }
        Ok(found)
    }

    /// Remember that the document for `(address, algorithm, commit)` was stored
    pub fn record(&self, address: &str, algorithm: HashAlgorithm, commit: &Digest) {
        self.record_key(&document_key(address, algorithm, commit));
    }

    /// Remember that `document` was stored
    pub fn record_key(&self, document: &Key) {
        self.seen.insert(document.name().to_string());
    }

    /// Check the memo only, without touching the store
    pub fn is_known(&self, document: &Key) -> bool {
        self.seen.contains(document.name())
    }

    /// Number of remembered documents
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if nothing is remembered
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
