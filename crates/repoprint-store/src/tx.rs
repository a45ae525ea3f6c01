//! Write transactions
//!
//! A transaction is an ordered list of operations applied by the store as one
//! unit: either every operation becomes visible or none does. Operations run
//! in insertion order, so a `DeleteDescendants` followed by fresh puts
//! replaces a parent's children wholesale.

use crate::record::encode_record;
use crate::{Key, Result};
use bytes::Bytes;
use serde::Serialize;

/// A single write operation
#[derive(Clone, Debug)]
pub enum Operation {
    /// Insert or overwrite a record
    Put { key: Key, value: Bytes },
    /// Remove a record if present
    Delete { key: Key },
    /// Remove every record nested under `parent` (the parent itself is kept)
    DeleteDescendants { parent: Key },
}

impl Operation {
    /// Key the operation is addressed to
    pub fn key(&self) -> &Key {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
            Operation::DeleteDescendants { parent } => parent,
        }
    }
}

/// An atomic batch of operations
#[derive(Clone, Debug, Default)]
pub struct Transaction {
    ops: Vec<Operation>,
}

impl Transaction {
    /// Create an empty transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a raw put
    pub fn put(&mut self, key: Key, value: impl Into<Bytes>) {
        self.ops.push(Operation::Put {
            key,
            value: value.into(),
        });
    }

    /// Stage a put of a serializable record
    pub fn put_record<T: Serialize>(&mut self, key: Key, record: &T) -> Result<()> {
        let value = encode_record(record)?;
        self.put(key, value);
        Ok(())
    }

    /// Stage a delete
    pub fn delete(&mut self, key: Key) {
        self.ops.push(Operation::Delete { key });
    }

    /// Stage removal of everything nested under `parent`
    pub fn delete_descendants(&mut self, parent: Key) {
        self.ops.push(Operation::DeleteDescendants { parent });
    }

    /// Number of staged operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if nothing is staged
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Iterate staged operations in order
    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.ops.iter()
    }

    /// Count staged puts
    pub fn put_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Operation::Put { .. }))
            .count()
    }
}

impl IntoIterator for Transaction {
    type Item = Operation;
    type IntoIter = std::vec::IntoIter<Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Kind;

    #[test]
    fn test_operations_keep_order() {
        let doc = Key::named(Kind::Document, "doc");
        let mut tx = Transaction::new();
        tx.delete_descendants(doc.clone());
        tx.put(doc.clone(), Bytes::from_static(b"header"));
        tx.delete(Key::child(&doc, Kind::TreeNode, "stale"));

        assert_eq!(tx.len(), 3);
        assert_eq!(tx.put_count(), 1);
        let kinds: Vec<_> = tx
            .iter()
            .map(|op| match op {
                Operation::DeleteDescendants { .. } => "clear",
                Operation::Put { .. } => "put",
                Operation::Delete { .. } => "delete",
            })
            .collect();
        assert_eq!(kinds, vec!["clear", "put", "delete"]);
    }

    #[test]
    fn test_put_record_encodes() {
        let mut tx = Transaction::new();
        tx.put_record(Key::named(Kind::Document, "doc"), &vec![1u32, 2, 3])
            .unwrap();
        match tx.iter().next().unwrap() {
            Operation::Put { value, .. } => assert!(!value.is_empty()),
            other => panic!("unexpected operation {:?}", other),
        }
    }
}
