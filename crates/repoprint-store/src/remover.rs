//! Throttled bulk removal of one record kind
//!
//! Runs a fixed number of workers over disjoint partitions of the key space
//! and sleeps between deletion batches to bound load on the backing store.
//! Hash-named kinds are partitioned by the leading hex nibble of the name;
//! documents are removed by a single partition.
//!
//! Removing documents does not touch their children. Remove each kind
//! separately, or delete a whole repository with a transaction, when
//! orphans matter.

use crate::{IndexStore, Kind, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

const HEX_NIBBLES: [&str; 16] = [
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "a", "b", "c", "d", "e", "f",
];

/// Bulk remover configuration
#[derive(Clone, Debug)]
pub struct RemoverConfig {
    /// Number of concurrent workers
    pub workers: usize,
    /// Keys deleted per batch
    pub batch_size: usize,
    /// Pause after each batch
    pub wait: Duration,
}

impl Default for RemoverConfig {
    fn default() -> Self {
        Self {
            workers: 16,
            batch_size: 500,
            wait: Duration::from_millis(500),
        }
    }
}

/// Deletes every record of a kind in throttled batches
pub struct BulkRemover<S: IndexStore + 'static> {
    store: Arc<S>,
    config: RemoverConfig,
}

impl<S: IndexStore + 'static> BulkRemover<S> {
    /// Create a remover over `store`
    pub fn new(store: Arc<S>, config: RemoverConfig) -> Self {
        Self { store, config }
    }

    /// Key-name prefixes, one per partition
    pub fn partitions(kind: Kind) -> Vec<&'static str> {
        if kind.hex_named() {
            HEX_NIBBLES.to_vec()
        } else {
            vec![""]
        }
    }

    /// Delete every record of `kind`, returning the number removed
    #[instrument(skip(self))]
    pub async fn remove_kind(&self, kind: Kind) -> Result<u64> {
        let partitions = Self::partitions(kind);
        let workers = self.config.workers.clamp(1, partitions.len());
        let batch_size = self.config.batch_size.max(1);
        let total = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            // Worker i owns partitions i, i + workers, i + 2 * workers, ...
            let owned: Vec<&'static str> = partitions
                .iter()
                .skip(worker)
                .step_by(workers)
                .copied()
                .collect();
            let store = Arc::clone(&self.store);
            let total = Arc::clone(&total);
            let wait = self.config.wait;

            handles.push(tokio::spawn(async move {
                for prefix in owned {
                    let keys = store.keys(kind, prefix).await?;
                    for batch in keys.chunks(batch_size) {
                        let deleted = store.delete_many(batch).await? as u64;
                        let running = total.fetch_add(deleted, Ordering::SeqCst) + deleted;
                        if running % (batch_size as u64 * 10) == 0 {
                            info!(kind = %kind, deleted = running, "bulk removal progress");
                        }
                        if !wait.is_zero() {
                            tokio::time::sleep(wait).await;
                        }
                    }
                }
                Ok::<(), crate::StoreError>(())
            }));
        }

        let mut first_error = None;
        for handle in handles {
            let outcome = handle
                .await
                .map_err(|e| crate::StoreError::Aborted(format!("remover worker panicked: {}", e)))
                .and_then(|r| r);
            if let Err(e) = outcome {
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let removed = total.load(Ordering::SeqCst);
        info!(kind = %kind, removed, "bulk removal complete");
        Ok(removed)
    }
}
