//! Deterministic key scheme
//!
//! - document: `<address>-<hashAlgorithm>-<commitHex>`
//! - bucket result: `<bucketHashHex>-<hashAlgorithm>`, under the document
//! - tree node: `<nodeHashHex>-<hashAlgorithm>-<filesContained>-<height>`, under the document
//!
//! Child records are scoped under their document, so the same bucket or node
//! hash produced by two repositories is stored once per owning document.

use repoprint_hash::{Digest, HashAlgorithm};
use repoprint_store::{Key, Kind};

/// Name of the document for `(address, algorithm, commit)`
pub fn document_name(address: &str, algorithm: HashAlgorithm, commit: &Digest) -> String {
    format!("{}-{}-{:x}", address, algorithm, commit)
}

/// Key of the document for `(address, algorithm, commit)`
pub fn document_key(address: &str, algorithm: HashAlgorithm, commit: &Digest) -> Key {
    Key::named(Kind::Document, document_name(address, algorithm, commit))
}

/// Key of a bucket result under `document`
pub fn bucket_key(document: &Key, bucket_hash: &Digest, algorithm: HashAlgorithm) -> Key {
    Key::child(
        document,
        Kind::BucketResult,
        format!("{:x}-{}", bucket_hash, algorithm),
    )
}

/// Key of a tree node under `document`
pub fn tree_node_key(
    document: &Key,
    node_hash: &Digest,
    algorithm: HashAlgorithm,
    files_contained: u64,
    height: u32,
) -> Key {
    Key::child(
        document,
        Kind::TreeNode,
        format!("{:x}-{}-{}-{}", node_hash, algorithm, files_contained, height),
    )
}

/// Name prefix shared by every tree node key with this hash
pub fn tree_node_prefix(node_hash: &Digest, algorithm: HashAlgorithm) -> String {
    format!("{:x}-{}-", node_hash, algorithm)
}

/// Fields encoded in a tree node key name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNodeName {
    pub node_hash: Digest,
    pub algorithm: HashAlgorithm,
    pub files_contained: u64,
    pub height: u32,
}

/// Parse a tree node key name back into its fields
pub fn parse_tree_node_name(name: &str) -> Option<TreeNodeName> {
    let mut parts = name.splitn(4, '-');
    let node_hash = Digest::from_hex(parts.next()?).ok()?;
    let algorithm = parts.next()?.parse().ok()?;
    let files_contained = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    Some(TreeNodeName {
        node_hash,
        algorithm,
        files_contained,
        height,
    })
}
