//! Supported file hash algorithms

use crate::{HashError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Algorithm used to fingerprint file content and aggregate fingerprints.
///
/// The textual identifier returned by [`HashAlgorithm::as_str`] is part of
/// every persisted key, so it must never change for an existing variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    /// All supported algorithms
    pub const ALL: [HashAlgorithm; 3] = [Self::Md5, Self::Sha256, Self::Blake3];

    /// Identifier used in store keys and documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha256 => "SHA256",
            Self::Blake3 => "BLAKE3",
        }
    }

    /// Digest width in bytes
    pub fn output_len(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha256 | Self::Blake3 => 32,
        }
    }

    /// Check that `bytes` has this algorithm's width
    pub fn check_width(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() != self.output_len() {
            return Err(HashError::WidthMismatch {
                algorithm: self.as_str(),
                expected: self.output_len(),
                actual: bytes.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "MD5" => Ok(Self::Md5),
            "SHA256" => Ok(Self::Sha256),
            "BLAKE3" => Ok(Self::Blake3),
            _ => Err(HashError::UnknownAlgorithm(s.to_string())),
        }
    }
}
