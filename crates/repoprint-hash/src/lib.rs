//! # Repoprint Hash
//!
//! Hashing primitives for repository fingerprinting.
//!
//! This crate provides:
//! - **Algorithms**: MD5, SHA-256 and BLAKE3, each with a fixed digest width
//! - **Digests**: a width-checked byte string with hex encoding
//! - **Aggregation**: the order-sensitive `combine` used for bucket and tree node hashes
//!
//! Aggregate hashes never carry repository identity, so two unrelated
//! repositories holding the same files in the same order produce the same
//! bucket and node hashes.
//!
//! ## Example
//!
//! ```rust
//! use repoprint_hash::{combine, hash_content, HashAlgorithm};
//!
//! let alg = HashAlgorithm::Md5;
//! let a = hash_content(alg, b"fn main() {}");
//! let b = hash_content(alg, b"pub mod lib;");
//! assert_ne!(combine(alg, [&a, &b]), combine(alg, [&b, &a]));
//! ```

pub mod algorithm;
pub mod digest;
pub mod error;

pub use algorithm::HashAlgorithm;
pub use digest::{combine, hash_content, Digest, IncrementalDigest};
pub use error::{HashError, Result};
