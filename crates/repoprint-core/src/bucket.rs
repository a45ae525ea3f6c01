//! Leaf bucketing of file fingerprints

use crate::model::{BucketResult, FileRecord};
use crate::tree::TreeNode;
use crate::{Result, ValidationError};
use repoprint_hash::{combine, Digest, HashAlgorithm};
use tracing::debug;

/// An ordered group of up to `bucket_size` file records
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bucket {
    /// Aggregate over member hashes in path order
    pub hash: Digest,
    /// Members in path order
    pub members: Vec<FileRecord>,
}

impl Bucket {
    /// Number of files in the bucket
    pub fn files_contained(&self) -> u64 {
        self.members.len() as u64
    }

    /// The bucket as a height-0 tree node
    pub fn as_node(&self) -> TreeNode {
        TreeNode {
            hash: self.hash.clone(),
            height: 0,
            files_contained: self.files_contained(),
            children: self.members.iter().map(|m| m.hash.clone()).collect(),
        }
    }

    /// The stored form of this bucket
    pub fn to_result(&self) -> BucketResult {
        BucketResult {
            bucket_hash: self.hash.clone(),
            paths: self.members.iter().map(|m| m.path.clone()).collect(),
            hashes: self.members.iter().map(|m| m.hash.clone()).collect(),
        }
    }
}

/// Partitions path-sorted file records into fixed-size buckets
#[derive(Clone, Debug)]
pub struct Bucketer {
    bucket_size: usize,
    algorithm: HashAlgorithm,
}

impl Bucketer {
    /// Create a bucketer; `bucket_size` must be positive
    pub fn new(bucket_size: usize, algorithm: HashAlgorithm) -> Self {
        assert!(bucket_size > 0, "bucket size must be positive");
        Self {
            bucket_size,
            algorithm,
        }
    }

    /// Get the bucket size
    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Check ordering, uniqueness and hash widths of `files`
    pub fn validate(&self, files: &[FileRecord]) -> std::result::Result<(), ValidationError> {
        let mut previous: Option<&str> = None;
        for (index, file) in files.iter().enumerate() {
            if file.path.is_empty() {
                return Err(ValidationError::EmptyPath { index });
            }
            if let Some(prev) = previous {
                if prev == file.path {
                    return Err(ValidationError::DuplicatePath(file.path.clone()));
                }
                if prev > file.path.as_str() {
                    return Err(ValidationError::Unsorted {
                        previous: prev.to_string(),
                        current: file.path.clone(),
                    });
                }
            }
            if file.hash.len() != self.algorithm.output_len() {
                return Err(ValidationError::HashWidth {
                    path: file.path.clone(),
                    expected: self.algorithm.output_len(),
                    actual: file.hash.len(),
                });
            }
            previous = Some(file.path.as_str());
        }
        Ok(())
    }

    /// Split `files` into consecutive buckets; the last may be short.
    ///
    /// No input yields no buckets.
    pub fn bucket(&self, files: &[FileRecord]) -> Result<Vec<Bucket>> {
        self.validate(files)?;
        Ok(self.split(files))
    }

    /// Split already validated `files` into buckets
    pub fn split(&self, files: &[FileRecord]) -> Vec<Bucket> {
        let buckets: Vec<Bucket> = files
            .chunks(self.bucket_size)
            .map(|members| Bucket {
                hash: combine(self.algorithm, members.iter().map(|m| &m.hash)),
                members: members.to_vec(),
            })
            .collect();

        debug!(
            files = files.len(),
            buckets = buckets.len(),
            bucket_size = self.bucket_size,
            "bucketed files"
        );
        buckets
    }
}
