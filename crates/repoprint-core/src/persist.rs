//! Transactional persistence of one repository's index

use crate::bucket::Bucket;
use crate::keys::{bucket_key, document_key, tree_node_key};
use crate::model::{RepoIndexDocument, RepoInfo};
use crate::tree::TreeLayers;
use crate::Result;
use repoprint_hash::{Digest, HashAlgorithm};
use repoprint_store::{IndexStore, Key, Transaction};
use std::sync::Arc;
use tracing::{info, instrument};

/// What a successful store wrote
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreSummary {
    /// Key of the stored document
    pub document: Key,
    /// Bucket result records staged
    pub bucket_results: usize,
    /// Tree node records staged
    pub tree_nodes: usize,
}

impl StoreSummary {
    /// Total records staged, document included
    pub fn records(&self) -> usize {
        1 + self.bucket_results + self.tree_nodes
    }
}

/// Writes a document and its full tree in one transaction
pub struct Persister<S: IndexStore> {
    store: Arc<S>,
}

impl<S: IndexStore> Persister<S> {
    /// Create a persister over `store`
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Stage every record for `repo` without committing.
    ///
    /// The document's previous children are dropped first, so re-indexing a
    /// commit replaces its tree instead of merging into it. Buckets or nodes
    /// sharing a hash within one document map to the same key and collapse
    /// into a single record.
    pub fn stage(
        repo: &RepoInfo,
        algorithm: HashAlgorithm,
        buckets: &[Bucket],
        tree: &TreeLayers,
    ) -> Result<(Transaction, StoreSummary)> {
        let document = document_key(&repo.address, algorithm, &repo.commit);
        let mut tx = Transaction::new();
        tx.delete_descendants(document.clone());
        tx.put_record(document.clone(), &RepoIndexDocument::new(repo, algorithm))?;

        let mut bucket_results = 0;
        for bucket in buckets.iter().filter(|b| b.files_contained() > 0) {
            tx.put_record(
                bucket_key(&document, &bucket.hash, algorithm),
                &bucket.to_result(),
            )?;
            bucket_results += 1;
        }

        let mut tree_nodes = 0;
        for node in tree.internal_nodes() {
            let key = tree_node_key(
                &document,
                &node.hash,
                algorithm,
                node.files_contained,
                node.height,
            );
            tx.put_record(key, &node.to_record())?;
            tree_nodes += 1;
        }

        Ok((
            tx,
            StoreSummary {
                document,
                bucket_results,
                tree_nodes,
            },
        ))
    }

    /// Write `repo`'s document, bucket results and tree nodes atomically
    #[instrument(skip_all, fields(address = %repo.address, commit = %repo.commit))]
    pub async fn store(
        &self,
        repo: &RepoInfo,
        algorithm: HashAlgorithm,
        buckets: &[Bucket],
        tree: &TreeLayers,
    ) -> Result<StoreSummary> {
        let (tx, summary) = Self::stage(repo, algorithm, buckets, tree)?;
        self.store.commit(tx).await?;
        info!(
            document = summary.document.name(),
            bucket_results = summary.bucket_results,
            tree_nodes = summary.tree_nodes,
            "stored repository index"
        );
        Ok(summary)
    }

    /// Delete a document together with all of its records
    #[instrument(skip(self, commit), fields(commit = %commit))]
    pub async fn remove(&self, address: &str, algorithm: HashAlgorithm, commit: &Digest) -> Result<()> {
        let document = document_key(address, algorithm, commit);
        let mut tx = Transaction::new();
        tx.delete_descendants(document.clone());
        tx.delete(document);
        self.store.commit(tx).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::Bucketer;
    use crate::model::FileRecord;
    use crate::tree::TreeBuilder;
    use crate::IndexError;
    use repoprint_hash::hash_content;
    use repoprint_store::{FaultInjectingStore, Kind, MemoryIndexStore};

    const ALG: HashAlgorithm = HashAlgorithm::Md5;

    fn repo() -> RepoInfo {
        RepoInfo {
            name: "zlib".to_string(),
            base_cpe: String::new(),
            version: "1.3".to_string(),
            commit: Digest::new(vec![0x11; 20]),
            tag: String::new(),
            when: None,
            repo_type: "GIT".to_string(),
            address: "https://github.com/madler/zlib".to_string(),
            file_exts: Vec::new(),
        }
    }

    fn built(n: usize) -> (Vec<Bucket>, TreeLayers) {
        let files: Vec<FileRecord> = (0..n)
            .map(|i| {
                let path = format!("f{:03}.c", i);
                let hash = hash_content(ALG, path.as_bytes());
                FileRecord::new(path, hash)
            })
            .collect();
        let buckets = Bucketer::new(2, ALG).bucket(&files).unwrap();
        let tree = TreeBuilder::new(2, ALG).build(&buckets);
        (buckets, tree)
    }

    #[tokio::test]
    async fn test_store_writes_all_records() {
        let store = Arc::new(MemoryIndexStore::new());
        let (buckets, tree) = built(5);
        let summary = Persister::new(Arc::clone(&store))
            .store(&repo(), ALG, &buckets, &tree)
            .await
            .unwrap();

        assert_eq!(summary.bucket_results, 3);
        assert_eq!(summary.tree_nodes, 3);
        assert_eq!(store.count(Kind::Document), 1);
        assert_eq!(store.count(Kind::BucketResult), 3);
        assert_eq!(store.count(Kind::TreeNode), 3);
        assert_eq!(store.len(), summary.records());
    }

    #[tokio::test]
    async fn test_reindex_replaces_previous_tree() {
        let store = Arc::new(MemoryIndexStore::new());
        let persister = Persister::new(Arc::clone(&store));
        let (buckets, tree) = built(9);
        persister.store(&repo(), ALG, &buckets, &tree).await.unwrap();

        let (buckets, tree) = built(3);
        persister.store(&repo(), ALG, &buckets, &tree).await.unwrap();
        assert_eq!(store.count(Kind::BucketResult), 2);
        assert_eq!(store.count(Kind::TreeNode), 1);
    }

    #[tokio::test]
    async fn test_empty_repository_stores_document_only() {
        let store = Arc::new(MemoryIndexStore::new());
        let (buckets, tree) = built(0);
        let summary = Persister::new(Arc::clone(&store))
            .store(&repo(), ALG, &buckets, &tree)
            .await
            .unwrap();
        assert_eq!(summary.records(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_commit_writes_nothing() {
        let store = Arc::new(FaultInjectingStore::new(MemoryIndexStore::new()));
        let repo = repo();
        store.fail_commits_for(document_key(&repo.address, ALG, &repo.commit).name());
        let (buckets, tree) = built(5);

        let err = Persister::new(Arc::clone(&store))
            .store(&repo, ALG, &buckets, &tree)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Store(_)));
        assert!(store.inner().is_empty());
    }

    #[tokio::test]
    async fn test_remove_drops_document_and_children() {
        let store = Arc::new(MemoryIndexStore::new());
        let persister = Persister::new(Arc::clone(&store));
        let (buckets, tree) = built(5);
        let repo = repo();
        persister.store(&repo, ALG, &buckets, &tree).await.unwrap();

        persister.remove(&repo.address, ALG, &repo.commit).await.unwrap();
        assert!(store.is_empty());
    }
}
