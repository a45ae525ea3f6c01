//! Layered hash tree construction
//!
//! Layer 0 holds the leaf buckets. Each following layer groups the previous
//! one into consecutive runs of `branching_factor` nodes and aggregates every
//! run into a parent one height up, until a single root remains or the height
//! cap is reached.
//!
//! A trailing node left without siblings is promoted as a single-child parent
//! that keeps its hash and file count, so the tree is never padded.

use crate::bucket::Bucket;
use crate::model::TreeNodeRecord;
use repoprint_hash::{combine, Digest, HashAlgorithm};
use tracing::debug;

/// A node at some height of the tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub hash: Digest,
    pub height: u32,
    /// Files subsumed transitively
    pub files_contained: u64,
    /// Hashes aggregated into `hash`, in order
    pub children: Vec<Digest>,
}

impl TreeNode {
    /// The stored form of this node
    pub fn to_record(&self) -> TreeNodeRecord {
        TreeNodeRecord {
            node_hash: self.hash.clone(),
            height: self.height,
            files_contained: self.files_contained,
            child_hashes: self.children.clone(),
        }
    }
}

/// Every layer of a built tree, leaf layer first
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeLayers {
    layers: Vec<Vec<TreeNode>>,
}

impl TreeLayers {
    /// All layers; index equals height
    pub fn layers(&self) -> &[Vec<TreeNode>] {
        &self.layers
    }

    /// Nodes at `height`
    pub fn layer(&self, height: u32) -> Option<&[TreeNode]> {
        self.layers.get(height as usize).map(Vec::as_slice)
    }

    /// The single top node, if construction converged
    pub fn root(&self) -> Option<&TreeNode> {
        match self.layers.last() {
            Some(top) if top.len() == 1 => top.first(),
            _ => None,
        }
    }

    /// Height of the top layer
    pub fn height(&self) -> Option<u32> {
        self.layers.len().checked_sub(1).map(|h| h as u32)
    }

    /// Files covered by the tree
    pub fn total_files(&self) -> u64 {
        self.layers
            .first()
            .map(|leaves| leaves.iter().map(|n| n.files_contained).sum())
            .unwrap_or(0)
    }

    /// Check if no node was built
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Total number of nodes across all layers
    pub fn node_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    /// Nodes above the leaf layer, lowest height first
    pub fn internal_nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.layers.iter().skip(1).flatten()
    }

    /// Panic if a structural invariant does not hold.
    ///
    /// Violations are logic bugs in construction, never bad input.
    pub fn assert_invariants(&self, branching_factor: usize) {
        for (height, layer) in self.layers.iter().enumerate() {
            for node in layer {
                assert_eq!(node.height as usize, height, "node height does not match its layer");
                assert!(node.files_contained > 0, "empty node retained in layer {}", height);
            }
        }
        for pair in self.layers.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            for (parent, group) in upper.iter().zip(lower.chunks(branching_factor)) {
                let sum: u64 = group.iter().map(|n| n.files_contained).sum();
                assert_eq!(parent.files_contained, sum, "parent does not sum its children");
            }
        }
        if let Some(root) = self.root() {
            assert_eq!(root.files_contained, self.total_files(), "root does not cover every file");
        }
    }
}

/// Builds the layered tree over leaf buckets
#[derive(Clone, Debug)]
pub struct TreeBuilder {
    branching_factor: usize,
    max_height: Option<u32>,
    algorithm: HashAlgorithm,
}

impl TreeBuilder {
    /// Create a builder; `branching_factor` must be at least 2
    pub fn new(branching_factor: usize, algorithm: HashAlgorithm) -> Self {
        assert!(branching_factor >= 2, "branching factor must be at least 2");
        Self {
            branching_factor,
            max_height: None,
            algorithm,
        }
    }

    /// Stop building above `max_height`
    pub fn with_max_height(mut self, max_height: Option<u32>) -> Self {
        self.max_height = max_height;
        self
    }

    /// Get the branching factor
    pub fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    /// Build the tree over `buckets`
    pub fn build(&self, buckets: &[Bucket]) -> TreeLayers {
        self.build_from_leaves(buckets.iter().map(Bucket::as_node).collect())
    }

    /// Build the tree over height-0 nodes
    pub fn build_from_leaves(&self, leaves: Vec<TreeNode>) -> TreeLayers {
        let leaves: Vec<TreeNode> = leaves
            .into_iter()
            .filter(|n| n.files_contained > 0)
            .collect();
        if leaves.is_empty() {
            return TreeLayers::default();
        }

        let mut layers = vec![leaves];
        loop {
            let current = &layers[layers.len() - 1];
            let height = current[0].height;
            if current.len() == 1 || self.max_height.is_some_and(|cap| height >= cap) {
                break;
            }

            let next: Vec<TreeNode> = current
                .chunks(self.branching_factor)
                .map(|group| self.parent(group, height + 1))
                .filter(|n| n.files_contained > 0)
                .collect();
            debug!(height = height + 1, nodes = next.len(), "built tree layer");
            layers.push(next);
        }

        let tree = TreeLayers { layers };
        tree.assert_invariants(self.branching_factor);
        tree
    }

    fn parent(&self, group: &[TreeNode], height: u32) -> TreeNode {
        let files_contained = group.iter().map(|n| n.files_contained).sum();
        let children: Vec<Digest> = group.iter().map(|n| n.hash.clone()).collect();
        let hash = match group {
            [only] => only.hash.clone(),
            _ => combine(self.algorithm, &children),
        };
        TreeNode {
            hash,
            height,
            files_contained,
            children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::Bucketer;
    use crate::model::FileRecord;
    use proptest::prelude::*;
    use repoprint_hash::hash_content;

    const ALG: HashAlgorithm = HashAlgorithm::Md5;

    fn files(n: usize) -> Vec<FileRecord> {
        (0..n)
            .map(|i| {
                let path = format!("src/file{:05}.c", i);
                let hash = hash_content(ALG, path.as_bytes());
                FileRecord::new(path, hash)
            })
            .collect()
    }

    fn build(n: usize, bucket_size: usize, branching: usize) -> TreeLayers {
        let buckets = Bucketer::new(bucket_size, ALG).bucket(&files(n)).unwrap();
        TreeBuilder::new(branching, ALG).build(&buckets)
    }

    #[test]
    fn test_worked_example() {
        let input = files(5);
        let buckets = Bucketer::new(2, ALG).bucket(&input).unwrap();
        let (b1, b2, b3) = (&buckets[0].hash, &buckets[1].hash, &buckets[2].hash);
        let tree = TreeBuilder::new(2, ALG).build(&buckets);

        assert_eq!(tree.layers().len(), 3);
        let height1 = tree.layer(1).unwrap();
        assert_eq!(height1.len(), 2);
        assert_eq!(height1[0].hash, combine(ALG, [b1, b2]));
        assert_eq!(height1[0].files_contained, 4);
        assert_eq!(&height1[1].hash, b3);
        assert_eq!(height1[1].files_contained, 1);
        assert_eq!(height1[1].children, vec![b3.clone()]);

        let root = tree.root().unwrap();
        assert_eq!(root.height, 2);
        assert_eq!(root.files_contained, 5);
        assert_eq!(root.hash, combine(ALG, [&height1[0].hash, &height1[1].hash]));
        assert_eq!(tree.internal_nodes().count(), 3);
    }

    #[test]
    fn test_empty_input_builds_nothing() {
        let tree = build(0, 4, 4);
        assert!(tree.is_empty());
        assert!(tree.root().is_none());
        assert_eq!(tree.height(), None);
        assert_eq!(tree.total_files(), 0);
    }

    #[test]
    fn test_single_bucket_is_root() {
        let tree = build(3, 4, 4);
        assert_eq!(tree.layers().len(), 1);
        assert_eq!(tree.root().unwrap().height, 0);
        assert_eq!(tree.internal_nodes().count(), 0);
    }

    #[test]
    fn test_partial_group_is_combined() {
        // 5 buckets with F = 4: one full group and a lone trailing bucket
        let tree = build(10, 2, 4);
        let height1 = tree.layer(1).unwrap();
        assert_eq!(height1.len(), 2);
        assert_eq!(height1[0].children.len(), 4);
        assert_eq!(height1[1].hash, tree.layer(0).unwrap()[4].hash);

        // 6 buckets with F = 4: the trailing pair is aggregated
        let tree = build(12, 2, 4);
        let leaves = tree.layer(0).unwrap();
        let tail = &tree.layer(1).unwrap()[1];
        assert_eq!(tail.hash, combine(ALG, [&leaves[4].hash, &leaves[5].hash]));
    }

    #[test]
    fn test_height_cap() {
        let buckets = Bucketer::new(1, ALG).bucket(&files(16)).unwrap();
        let tree = TreeBuilder::new(2, ALG)
            .with_max_height(Some(2))
            .build(&buckets);
        assert_eq!(tree.height(), Some(2));
        assert_eq!(tree.layer(2).unwrap().len(), 4);
        assert!(tree.root().is_none());

        let tree = TreeBuilder::new(2, ALG)
            .with_max_height(Some(0))
            .build(&buckets);
        assert_eq!(tree.layers().len(), 1);
    }

    #[test]
    fn test_zero_file_leaves_are_dropped() {
        let empty = TreeNode {
            hash: hash_content(ALG, b""),
            height: 0,
            files_contained: 0,
            children: Vec::new(),
        };
        let tree = TreeBuilder::new(2, ALG).build_from_leaves(vec![empty]);
        assert!(tree.is_empty());
    }

    #[test]
    #[should_panic(expected = "parent does not sum its children")]
    fn test_invariant_violation_panics() {
        let mut tree = build(8, 2, 2);
        tree.layers[1][0].files_contained += 1;
        tree.assert_invariants(2);
    }

    proptest! {
        #[test]
        fn prop_tree_invariants(n in 0usize..300, bucket_size in 1usize..9, branching in 2usize..6) {
            let tree = build(n, bucket_size, branching);
            for (height, layer) in tree.layers().iter().enumerate() {
                prop_assert!(layer.iter().all(|node| node.height as usize == height));
            }
            if n > 0 {
                let root = tree.root().unwrap();
                prop_assert_eq!(root.files_contained, n as u64);
            } else {
                prop_assert!(tree.is_empty());
            }
        }

        #[test]
        fn prop_deterministic(n in 0usize..120, bucket_size in 1usize..6, branching in 2usize..5) {
            let first = build(n, bucket_size, branching);
            let second = build(n, bucket_size, branching);
            prop_assert_eq!(first, second);
        }
    }
}
