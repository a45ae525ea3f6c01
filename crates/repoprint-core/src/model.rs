//! Index data model
//!
//! `RepoInfo`, `FileRecord` and `PreparedRepo` are handed over by the
//! preparation stage. `RepoIndexDocument`, `BucketResult` and
//! `TreeNodeRecord` are the three record kinds written to the store.

use chrono::{DateTime, Utc};
use repoprint_hash::{Digest, HashAlgorithm};
use serde::{Deserialize, Serialize};

/// One file's fingerprint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the repository root
    pub path: String,
    /// Content hash
    pub hash: Digest,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, hash: Digest) -> Self {
        Self {
            path: path.into(),
            hash,
        }
    }
}

/// Repository metadata produced by preparation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    /// CPE-like base identifier
    #[serde(default)]
    pub base_cpe: String,
    #[serde(default)]
    pub version: String,
    /// Commit object id
    pub commit: Digest,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub when: Option<DateTime<Utc>>,
    /// Repository kind, e.g. "GIT"
    #[serde(default = "default_repo_type")]
    pub repo_type: String,
    /// Repository address
    pub address: String,
    /// File extensions considered during preparation
    #[serde(default)]
    pub file_exts: Vec<String>,
}

fn default_repo_type() -> String {
    "GIT".to_string()
}

/// A file preparation could not hash
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadableFile {
    pub path: String,
    pub reason: String,
}

/// Preparation output for one repository at one commit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedRepo {
    pub repo: RepoInfo,
    /// File fingerprints sorted by path
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub unreadable: Vec<UnreadableFile>,
}

impl PreparedRepo {
    pub fn new(repo: RepoInfo, files: Vec<FileRecord>) -> Self {
        Self {
            repo,
            files,
            unreadable: Vec::new(),
        }
    }
}

/// Per-commit index header; parent of every bucket and tree node record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoIndexDocument {
    pub name: String,
    pub base_cpe: String,
    pub version: String,
    pub commit: Digest,
    pub tag: String,
    pub when: Option<DateTime<Utc>>,
    pub repo_type: String,
    pub repo_addr: String,
    pub file_exts: Vec<String>,
    pub file_hash_type: HashAlgorithm,
}

impl RepoIndexDocument {
    /// Build the document for `repo` indexed with `algorithm`
    pub fn new(repo: &RepoInfo, algorithm: HashAlgorithm) -> Self {
        Self {
            name: repo.name.clone(),
            base_cpe: repo.base_cpe.clone(),
            version: repo.version.clone(),
            commit: repo.commit.clone(),
            tag: repo.tag.clone(),
            when: repo.when,
            repo_type: repo.repo_type.clone(),
            repo_addr: repo.address.clone(),
            file_exts: repo.file_exts.clone(),
            file_hash_type: algorithm,
        }
    }
}

/// Stored leaf bucket, keeping member paths and hashes for reverse lookup
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketResult {
    pub bucket_hash: Digest,
    pub paths: Vec<String>,
    pub hashes: Vec<Digest>,
}

impl BucketResult {
    /// Number of files in the bucket
    pub fn files_contained(&self) -> usize {
        self.paths.len()
    }

    /// Iterate `(path, hash)` members in order
    pub fn members(&self) -> impl Iterator<Item = (&str, &Digest)> {
        self.paths.iter().map(String::as_str).zip(self.hashes.iter())
    }
}

/// Stored internal tree node
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNodeRecord {
    pub node_hash: Digest,
    pub height: u32,
    pub files_contained: u64,
    pub child_hashes: Vec<Digest>,
}
