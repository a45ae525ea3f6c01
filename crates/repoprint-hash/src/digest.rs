//! Digests and order-sensitive aggregation
//!
//! A bucket hash is `combine` over its member file hashes in path order, and a
//! tree node hash is `combine` over its children's hashes in layer order.
//! `combine` digests the plain concatenation of its inputs, so the result is
//! stable across platforms and runs.

use crate::{HashAlgorithm, HashError, Result};
use md5::Md5;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// A fixed-width digest produced by one [`HashAlgorithm`]
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(Vec<u8>);

impl Digest {
    /// Wrap raw digest bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Wrap raw bytes, checking the width against `algorithm`
    pub fn for_algorithm(algorithm: HashAlgorithm, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        algorithm.check_width(&bytes)?;
        Ok(Self(bytes))
    }

    /// Parse a hex string
    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(hex::decode(s)?))
    }

    /// Get the digest as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to a lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Width in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the digest holds no bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the raw bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::LowerHex for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Digest {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(de::Error::custom)
    }
}

enum Inner {
    Md5(Md5),
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

/// Streaming hasher over any supported algorithm
pub struct IncrementalDigest {
    inner: Inner,
    bytes_processed: u64,
}

impl IncrementalDigest {
    /// Create a new hasher for `algorithm`
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let inner = match algorithm {
            HashAlgorithm::Md5 => Inner::Md5(Md5::new()),
            HashAlgorithm::Sha256 => Inner::Sha256(Sha256::new()),
            HashAlgorithm::Blake3 => Inner::Blake3(Box::new(blake3::Hasher::new())),
        };
        Self {
            inner,
            bytes_processed: 0,
        }
    }

    /// Update the hasher with more data
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            Inner::Md5(h) => h.update(data),
            Inner::Sha256(h) => h.update(data),
            Inner::Blake3(h) => {
                h.update(data);
            }
        }
        self.bytes_processed += data.len() as u64;
    }

    /// Finalize and return the digest
    pub fn finalize(self) -> Digest {
        match self.inner {
            Inner::Md5(h) => Digest(h.finalize().to_vec()),
            Inner::Sha256(h) => Digest(h.finalize().to_vec()),
            Inner::Blake3(h) => Digest(h.finalize().as_bytes().to_vec()),
        }
    }

    /// Get the number of bytes processed
    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }
}

/// Hash raw file content
pub fn hash_content(algorithm: HashAlgorithm, data: &[u8]) -> Digest {
    let mut hasher = IncrementalDigest::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

/// Aggregate child digests, in order, into one parent digest
pub fn combine<'a, I>(algorithm: HashAlgorithm, children: I) -> Digest
where
    I: IntoIterator<Item = &'a Digest>,
{
    let mut hasher = IncrementalDigest::new(algorithm);
    for child in children {
        hasher.update(child.as_bytes());
    }
    hasher.finalize()
}

impl TryFrom<(HashAlgorithm, &str)> for Digest {
    type Error = HashError;

    fn try_from((algorithm, s): (HashAlgorithm, &str)) -> Result<Self> {
        let digest = Digest::from_hex(s)?;
        algorithm.check_width(digest.as_bytes())?;
        Ok(digest)
    }
}
