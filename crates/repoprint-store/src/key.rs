//! Record kinds and parent-scoped keys
//!
//! A key is a `(kind, name)` pair optionally nested under a parent key, the
//! same shape as an ancestor path in a hierarchical document store. The
//! encoded path form `Kind:name/Kind:name` orders every descendant of a key
//! directly after it, which is what makes ancestor queries a prefix scan.

use crate::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between path segments of an encoded key
pub const PATH_SEPARATOR: char = '/';

/// Kind of record held in the store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    /// Per-commit repository index header
    Document,
    /// Leaf bucket with its member paths and hashes
    BucketResult,
    /// Internal tree node
    TreeNode,
}

impl Kind {
    /// All kinds
    pub const ALL: [Kind; 3] = [Kind::Document, Kind::BucketResult, Kind::TreeNode];

    /// Stable kind name used in encoded keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Document => "RepoIndex",
            Kind::BucketResult => "RepoIndexBucket",
            Kind::TreeNode => "RepoIndexResultTree",
        }
    }

    /// Whether names of this kind start with a hex digest
    pub fn hex_named(&self) -> bool {
        matches!(self, Kind::BucketResult | Kind::TreeNode)
    }

    fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record key, optionally scoped under a parent key
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    kind: Kind,
    name: String,
    parent: Option<Box<Key>>,
}

impl Key {
    /// Create a root-level key
    pub fn named(kind: Kind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            parent: None,
        }
    }

    /// Create a key scoped under `parent`
    pub fn child(parent: &Key, kind: Kind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            parent: Some(Box::new(parent.clone())),
        }
    }

    /// Get the record kind
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Get the name within the parent scope
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the parent key
    pub fn parent(&self) -> Option<&Key> {
        self.parent.as_deref()
    }

    /// Outermost ancestor (the key itself when it has no parent)
    pub fn root(&self) -> &Key {
        let mut key = self;
        while let Some(parent) = key.parent() {
            key = parent;
        }
        key
    }

    /// Check whether `self` is nested, at any depth, under `ancestor`
    pub fn is_descendant_of(&self, ancestor: &Key) -> bool {
        let mut current = self.parent();
        while let Some(key) = current {
            if key == ancestor {
                return true;
            }
            current = key.parent();
        }
        false
    }

    /// Reject keys the store cannot hold
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(StoreError::InvalidKey(format!(
                "empty {} name",
                self.kind.as_str()
            )));
        }
        match self.parent() {
            Some(parent) => parent.validate(),
            None => Ok(()),
        }
    }

    /// Encode as an ordered path string
    pub fn encode(&self) -> String {
        let segment = format!("{}:{}", self.kind.as_str(), urlencoding::encode(&self.name));
        match self.parent() {
            Some(parent) => format!("{}{}{}", parent.encode(), PATH_SEPARATOR, segment),
            None => segment,
        }
    }

    /// Prefix shared by the encoded form of every descendant
    pub fn descendant_prefix(&self) -> String {
        format!("{}{}", self.encode(), PATH_SEPARATOR)
    }

    /// Decode a path produced by [`Key::encode`]
    pub fn decode(path: &str) -> Result<Self> {
        let mut key: Option<Key> = None;
        for segment in path.split(PATH_SEPARATOR) {
            let (kind, name) = segment
                .split_once(':')
                .ok_or_else(|| StoreError::InvalidKey(path.to_string()))?;
            let kind =
                Kind::from_name(kind).ok_or_else(|| StoreError::InvalidKey(path.to_string()))?;
            let name = urlencoding::decode(name)
                .map_err(|_| StoreError::InvalidKey(path.to_string()))?
                .into_owned();
            key = Some(match key {
                Some(parent) => Key::child(&parent, kind, name),
                None => Key::named(kind, name),
            });
        }
        let key = key.ok_or_else(|| StoreError::InvalidKey(path.to_string()))?;
        key.validate()?;
        Ok(key)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.encode())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn doc() -> Key {
        Key::named(Kind::Document, "https://github.com/org/repo-MD5-abcd")
    }

    #[test]
    fn test_child_scoping() {
        let parent = doc();
        let child = Key::child(&parent, Kind::TreeNode, "ff-MD5-4-1");
        assert_eq!(child.parent(), Some(&parent));
        assert_eq!(child.root(), &parent);
        assert!(child.is_descendant_of(&parent));
        assert!(!parent.is_descendant_of(&child));
    }

    #[test]
    fn test_encode_escapes_separators() {
        let encoded = doc().encode();
        assert_eq!(encoded.matches(PATH_SEPARATOR).count(), 0);
        assert!(encoded.starts_with("RepoIndex:"));
    }

    #[test]
    fn test_encode_decode() {
        let child = Key::child(&doc(), Kind::BucketResult, "00aa-MD5");
        assert_eq!(Key::decode(&child.encode()).unwrap(), child);
    }

    #[test]
    fn test_descendants_share_prefix() {
        let parent = doc();
        let child = Key::child(&parent, Kind::TreeNode, "01-MD5-2-1");
        assert!(child.encode().starts_with(&parent.descendant_prefix()));

        // A sibling document whose name extends this one is not a descendant
        let sibling = Key::named(Kind::Document, format!("{}0", parent.name()));
        assert!(!sibling.encode().starts_with(&parent.descendant_prefix()));
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        assert!(Key::named(Kind::Document, "").validate().is_err());
        let child = Key::child(&Key::named(Kind::Document, ""), Kind::TreeNode, "x");
        assert!(child.validate().is_err());
        assert!(Key::decode("Unknown:x").is_err());
    }

    #[rstest]
    #[case(Kind::Document, "RepoIndex", false)]
    #[case(Kind::BucketResult, "RepoIndexBucket", true)]
    #[case(Kind::TreeNode, "RepoIndexResultTree", true)]
    fn test_kind_names(#[case] kind: Kind, #[case] name: &str, #[case] hex_named: bool) {
        assert_eq!(kind.as_str(), name);
        assert_eq!(kind.hex_named(), hex_named);
    }

    proptest! {
        #[test]
        fn prop_any_name_survives_encoding(parent in ".+", name in ".+") {
            let key = Key::child(&Key::named(Kind::Document, parent), Kind::TreeNode, name);
            prop_assert_eq!(Key::decode(&key.encode()).unwrap(), key);
        }
    }
}
