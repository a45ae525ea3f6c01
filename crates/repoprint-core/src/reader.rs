//! Read side of the index, as consumed by a matcher

use crate::keys::{document_key, parse_tree_node_name, tree_node_prefix};
use crate::model::{BucketResult, RepoIndexDocument, TreeNodeRecord};
use crate::{IndexError, Result};
use repoprint_hash::{Digest, HashAlgorithm};
use repoprint_store::{decode_record, Entry, IndexStore, Key, Kind};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::instrument;

/// A record found by a cross-document query, with its owning document
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Owned<T> {
    pub document: Key,
    pub record: T,
}

/// Queries over stored indexes
pub struct IndexReader<S: IndexStore> {
    store: Arc<S>,
}

impl<S: IndexStore> IndexReader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Point lookup of the document for `(address, algorithm, commit)`
    pub async fn get_document(
        &self,
        address: &str,
        algorithm: HashAlgorithm,
        commit: &Digest,
    ) -> Result<Option<RepoIndexDocument>> {
        self.document(&document_key(address, algorithm, commit)).await
    }

    /// Point lookup of a document by key
    #[instrument(skip_all, fields(document = key.name()))]
    pub async fn document(&self, key: &Key) -> Result<Option<RepoIndexDocument>> {
        match self.store.get(key).await? {
            Some(bytes) => decode(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Bucket results stored under `document`
    pub async fn bucket_results(&self, document: &Key) -> Result<Vec<BucketResult>> {
        let entries = self
            .store
            .descendants(document, Some(Kind::BucketResult))
            .await?;
        entries.iter().map(|(key, bytes)| decode(key, bytes)).collect()
    }

    /// Tree nodes stored under `document`, lowest height first
    pub async fn tree_nodes(&self, document: &Key) -> Result<Vec<TreeNodeRecord>> {
        let entries = self.store.descendants(document, Some(Kind::TreeNode)).await?;
        let mut nodes = entries
            .iter()
            .map(|(key, bytes)| decode::<TreeNodeRecord>(key, bytes))
            .collect::<Result<Vec<_>>>()?;
        nodes.sort_by_key(|n| n.height);
        Ok(nodes)
    }

    /// Tree nodes of `algorithm` at `height` across every document
    #[instrument(skip(self))]
    pub async fn nodes_at_height(
        &self,
        algorithm: HashAlgorithm,
        height: u32,
    ) -> Result<Vec<Owned<TreeNodeRecord>>> {
        let keys = self.store.keys(Kind::TreeNode, "").await?;
        let mut found = Vec::new();
        for key in keys {
            let wanted = parse_tree_node_name(key.name())
                .is_some_and(|n| n.algorithm == algorithm && n.height == height);
            if !wanted {
                continue;
            }
            if let Some(bytes) = self.store.get(&key).await? {
                found.push(owned(&key, &bytes)?);
            }
        }
        Ok(found)
    }

    /// Tree nodes with `node_hash` across every document
    #[instrument(skip(self, node_hash), fields(node_hash = %node_hash))]
    pub async fn nodes_by_hash(
        &self,
        node_hash: &Digest,
        algorithm: HashAlgorithm,
    ) -> Result<Vec<Owned<TreeNodeRecord>>> {
        let prefix = tree_node_prefix(node_hash, algorithm);
        let entries = self.store.scan(Kind::TreeNode, &prefix, None).await?;
        entries.iter().map(|(key, bytes)| owned(key, bytes)).collect()
    }

    /// Bucket results with `bucket_hash` across every document
    #[instrument(skip(self, bucket_hash), fields(bucket_hash = %bucket_hash))]
    pub async fn buckets_by_hash(
        &self,
        bucket_hash: &Digest,
        algorithm: HashAlgorithm,
    ) -> Result<Vec<Owned<BucketResult>>> {
        let name = format!("{:x}-{}", bucket_hash, algorithm);
        let entries: Vec<Entry> = self.store.scan(Kind::BucketResult, &name, None).await?;
        entries
            .iter()
            .filter(|(key, _)| key.name() == name)
            .map(|(key, bytes)| owned(key, bytes))
            .collect()
    }
}

fn decode<T: DeserializeOwned>(key: &Key, bytes: &[u8]) -> Result<T> {
    decode_record(bytes).map_err(|e| IndexError::CorruptRecord {
        key: key.encode(),
        reason: e.to_string(),
    })
}

fn owned<T: DeserializeOwned>(key: &Key, bytes: &[u8]) -> Result<Owned<T>> {
    let document = key.parent().cloned().ok_or_else(|| IndexError::CorruptRecord {
        key: key.encode(),
        reason: "record has no owning document".to_string(),
    })?;
    Ok(Owned {
        document,
        record: decode(key, bytes)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::Bucketer;
    use crate::model::{FileRecord, RepoInfo};
    use crate::persist::Persister;
    use crate::tree::TreeBuilder;
    use repoprint_hash::hash_content;
    use repoprint_store::{MemoryIndexStore, Transaction};

    const ALG: HashAlgorithm = HashAlgorithm::Md5;

    fn repo(address: &str, commit: u8) -> RepoInfo {
        RepoInfo {
            name: address.rsplit('/').next().unwrap_or_default().to_string(),
            base_cpe: String::new(),
            version: String::new(),
            commit: Digest::new(vec![commit; 20]),
            tag: String::new(),
            when: None,
            repo_type: "GIT".to_string(),
            address: address.to_string(),
            file_exts: vec![".c".to_string()],
        }
    }

    async fn index(store: &Arc<MemoryIndexStore>, repo: &RepoInfo, contents: &[&str]) {
        let files: Vec<FileRecord> = contents
            .iter()
            .enumerate()
            .map(|(i, c)| FileRecord::new(format!("src/{:02}.c", i), hash_content(ALG, c.as_bytes())))
            .collect();
        let buckets = Bucketer::new(2, ALG).bucket(&files).unwrap();
        let tree = TreeBuilder::new(2, ALG).build(&buckets);
        Persister::new(Arc::clone(store))
            .store(repo, ALG, &buckets, &tree)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_document_lookup() {
        let store = Arc::new(MemoryIndexStore::new());
        let zlib = repo("https://github.com/madler/zlib", 1);
        index(&store, &zlib, &["a", "b", "c"]).await;

        let reader = IndexReader::new(Arc::clone(&store));
        let doc = reader.get_document(&zlib.address, ALG, &zlib.commit).await.unwrap().unwrap();
        assert_eq!(doc.name, "zlib");
        assert_eq!(doc.file_exts, vec![".c"]);
        assert!(reader
            .get_document(&zlib.address, HashAlgorithm::Sha256, &zlib.commit)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_records_of_one_document() {
        let store = Arc::new(MemoryIndexStore::new());
        let zlib = repo("https://github.com/madler/zlib", 1);
        index(&store, &zlib, &["a", "b", "c", "d", "e"]).await;
        index(&store, &repo("https://github.com/other/fork", 2), &["x"]).await;

        let reader = IndexReader::new(Arc::clone(&store));
        let doc = document_key(&zlib.address, ALG, &zlib.commit);
        assert_eq!(reader.bucket_results(&doc).await.unwrap().len(), 3);

        let nodes = reader.tree_nodes(&doc).await.unwrap();
        assert_eq!(nodes.iter().map(|n| n.height).collect::<Vec<_>>(), vec![1, 1, 2]);
        assert_eq!(nodes[2].files_contained, 5);
    }

    #[tokio::test]
    async fn test_shared_hash_found_in_both_documents() {
        let store = Arc::new(MemoryIndexStore::new());
        let upstream = repo("https://github.com/madler/zlib", 1);
        let vendored = repo("https://github.com/acme/app", 2);
        index(&store, &upstream, &["a", "b", "c", "d"]).await;
        index(&store, &vendored, &["a", "b", "c", "d"]).await;

        let reader = IndexReader::new(Arc::clone(&store));
        // Two buckets each, so height 1 holds one root per document
        let nodes = reader.nodes_at_height(ALG, 1).await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(reader.nodes_at_height(ALG, 2).await.unwrap().is_empty());

        let root = &nodes[0];
        let owners = reader.nodes_by_hash(&root.record.node_hash, ALG).await.unwrap();
        let mut documents: Vec<_> = owners.iter().map(|o| o.document.name().to_string()).collect();
        documents.sort();
        assert_eq!(documents.len(), 2);
        assert!(documents[0].starts_with("https://github.com/acme/app-MD5-"));

        let bucket = &reader.bucket_results(&owners[0].document).await.unwrap()[0];
        let found = reader.buckets_by_hash(&bucket.bucket_hash, ALG).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].record.paths, bucket.paths);
    }

    #[tokio::test]
    async fn test_corrupt_record_reported() {
        let store = Arc::new(MemoryIndexStore::new());
        let key = Key::named(Kind::Document, "broken");
        let mut tx = Transaction::new();
        tx.put(key.clone(), vec![0xffu8, 0x00]);
        store.commit(tx).await.unwrap();

        let err = IndexReader::new(Arc::clone(&store)).document(&key).await.unwrap_err();
        assert!(matches!(err, IndexError::CorruptRecord { .. }));
    }
}
