//! Fixed-height Poseidon Merkle tree
//!
//! The client-side view of the ledger commitment. Every leaf starts as
//! [`UNSET`]; only nodes that differ from the empty subtree of their level
//! are stored. The chain itself only ever sees the root.

use std::collections::HashMap;

use tracing::debug;
use zkdeposit_prover::M31;

use crate::digest::Digest;
use crate::error::{CircuitError, CircuitResult};
use crate::poseidon::hash2;
use crate::witness::{MerkleWitness, PathStep};

/// Merkle tree height used by the ledger (2^20 leaf slots)
pub const TREE_HEIGHT: usize = 20;

/// Largest supported height; indices are `u64` and capacity is `2^height`.
pub const MAX_TREE_HEIGHT: usize = 32;

/// Leaf value of a slot that has not been deposited into
pub const UNSET: M31 = M31::ZERO;

/// Leaf value of a slot that has been deposited into
pub const SET: M31 = M31::ONE;

pub(crate) fn check_height(height: usize) -> CircuitResult<()> {
    if height == 0 || height > MAX_TREE_HEIGHT {
        return Err(CircuitError::InvalidHeight { height });
    }
    Ok(())
}

/// Roots of all-`UNSET` subtrees; `roots[i]` has height `i`.
pub fn empty_subtree_roots(height: usize) -> Vec<Digest> {
    let mut roots = Vec::with_capacity(height + 1);
    roots.push(Digest::from_leaf(UNSET));
    for i in 1..=height {
        roots.push(hash2(&roots[i - 1], &roots[i - 1]));
    }
    roots
}

/// Root of a fresh tree of the given height
pub fn empty_root(height: usize) -> CircuitResult<Digest> {
    check_height(height)?;
    Ok(empty_subtree_roots(height)[height])
}

/// Sparse Merkle tree over `2^height` leaves
#[derive(Clone, Debug)]
pub struct MerkleTree {
    height: usize,
    /// Non-empty nodes keyed by (level, index); level 0 holds leaves
    nodes: HashMap<(usize, u64), Digest>,
    empty_roots: Vec<Digest>,
}

impl MerkleTree {
    /// Create a tree with every leaf `UNSET`
    pub fn new(height: usize) -> CircuitResult<Self> {
        check_height(height)?;
        debug!(height, "creating merkle tree");
        Ok(Self {
            height,
            nodes: HashMap::new(),
            empty_roots: empty_subtree_roots(height),
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of leaf slots
    pub fn capacity(&self) -> u64 {
        1u64 << self.height
    }

    fn check_index(&self, index: u64) -> CircuitResult<()> {
        if index >= self.capacity() {
            return Err(CircuitError::IndexOutOfRange {
                index,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    fn node(&self, level: usize, index: u64) -> Digest {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.empty_roots[level])
    }

    fn store(&mut self, level: usize, index: u64, value: Digest) {
        if value == self.empty_roots[level] {
            self.nodes.remove(&(level, index));
        } else {
            self.nodes.insert((level, index), value);
        }
    }

    /// Current root
    pub fn root(&self) -> Digest {
        self.node(self.height, 0)
    }

    pub fn get_leaf(&self, index: u64) -> CircuitResult<M31> {
        self.check_index(index)?;
        Ok(self.node(0, index).limbs()[0])
    }

    /// Set a leaf and rehash its path to the root
    pub fn set_leaf(&mut self, index: u64, value: M31) -> CircuitResult<()> {
        self.check_index(index)?;

        self.store(0, index, Digest::from_leaf(value));
        let mut idx = index;
        for level in 1..=self.height {
            idx >>= 1;
            let parent = hash2(
                &self.node(level - 1, idx << 1),
                &self.node(level - 1, (idx << 1) | 1),
            );
            self.store(level, idx, parent);
        }

        debug!(index, value = %value, root = %self.root(), "leaf updated");
        Ok(())
    }

    /// Inclusion witness for a leaf slot
    pub fn get_witness(&self, index: u64) -> CircuitResult<MerkleWitness> {
        self.check_index(index)?;

        let mut idx = index;
        let steps = (0..self.height)
            .map(|level| {
                let step = PathStep {
                    sibling: self.node(level, idx ^ 1),
                    is_left: idx & 1 == 0,
                };
                idx >>= 1;
                step
            })
            .collect();

        Ok(MerkleWitness::new(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf(value: M31) -> Digest {
        Digest::from_leaf(value)
    }

    #[test]
    fn test_empty_tree() {
        let tree = MerkleTree::new(4).unwrap();
        assert_eq!(tree.root(), empty_root(4).unwrap());
        assert_eq!(tree.capacity(), 16);

        let level1 = hash2(&leaf(UNSET), &leaf(UNSET));
        assert_eq!(empty_subtree_roots(1), vec![leaf(UNSET), level1]);
    }

    #[test]
    fn test_invalid_height() {
        assert_eq!(
            MerkleTree::new(0).unwrap_err(),
            CircuitError::InvalidHeight { height: 0 }
        );
        assert!(MerkleTree::new(MAX_TREE_HEIGHT + 1).is_err());
        assert!(empty_root(0).is_err());
    }

    #[test]
    fn test_index_out_of_range() {
        let tree = MerkleTree::new(3).unwrap();
        assert!(tree.get_witness(7).is_ok());
        assert_eq!(
            tree.get_witness(8).unwrap_err(),
            CircuitError::IndexOutOfRange { index: 8, capacity: 8 }
        );
    }

    #[test]
    fn test_set_leaf_matches_manual_hashing() {
        let mut tree = MerkleTree::new(2).unwrap();
        tree.set_leaf(2, SET).unwrap();

        let left = hash2(&leaf(UNSET), &leaf(UNSET));
        let right = hash2(&leaf(SET), &leaf(UNSET));
        assert_eq!(tree.root(), hash2(&left, &right));
        assert_eq!(tree.get_leaf(2).unwrap(), SET);
    }

    #[test]
    fn test_reset_leaf_restores_empty_root() {
        let mut tree = MerkleTree::new(8).unwrap();
        tree.set_leaf(77, SET).unwrap();
        assert_ne!(tree.root(), empty_root(8).unwrap());

        tree.set_leaf(77, UNSET).unwrap();
        assert_eq!(tree.root(), empty_root(8).unwrap());
        assert!(tree.nodes.is_empty());
    }

    #[test]
    fn test_witness_shape() {
        let tree = MerkleTree::new(TREE_HEIGHT).unwrap();
        let witness = tree.get_witness(5).unwrap();
        assert_eq!(witness.height(), TREE_HEIGHT);
        assert_eq!(witness.calculate_index(), 5);
    }

    #[test]
    fn test_full_height_tree() {
        let mut tree = MerkleTree::new(TREE_HEIGHT).unwrap();
        assert_eq!(tree.capacity(), 1 << 20);
        assert_eq!(tree.root(), empty_root(TREE_HEIGHT).unwrap());

        let last = tree.capacity() - 1;
        let witness = tree.get_witness(last).unwrap();
        assert_eq!(witness.calculate_root(UNSET), tree.root());

        tree.set_leaf(last, SET).unwrap();
        assert_eq!(witness.calculate_root(SET), tree.root());
        assert!(tree.get_witness(tree.capacity()).is_err());
    }

    #[test]
    fn test_sequential_deposits_chain_roots() {
        let mut tree = MerkleTree::new(TREE_HEIGHT).unwrap();

        for index in 0..4u64 {
            let witness = tree.get_witness(index).unwrap();
            let before = tree.root();
            assert_eq!(witness.calculate_root(UNSET), before);

            tree.set_leaf(index, SET).unwrap();
            assert_eq!(witness.calculate_root(SET), tree.root());
            assert_ne!(tree.root(), before);
        }
    }

    #[test]
    fn test_no_root_collisions_across_small_tree() {
        // every single-leaf tree of height 6 has its own root
        let mut roots = std::collections::HashSet::new();
        for index in 0..64u64 {
            for value in [SET, M31::new(2)] {
                let mut tree = MerkleTree::new(6).unwrap();
                tree.set_leaf(index, value).unwrap();
                assert!(roots.insert(tree.root()), "index {index} value {value}");
            }
        }
        assert!(!roots.contains(&empty_root(6).unwrap()));
    }

    /// Height, an in-range index, and a leaf value
    fn tree_case() -> impl Strategy<Value = (usize, u64, M31)> {
        (1usize..=10).prop_flat_map(|height| {
            (
                Just(height),
                0..(1u64 << height),
                (0u32..1000).prop_map(M31::new),
            )
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_witness_recomputes_updated_root((height, index, value) in tree_case()) {
            let tree = MerkleTree::new(height).unwrap();
            let witness = tree.get_witness(index).unwrap();

            let mut updated = tree.clone();
            updated.set_leaf(index, value).unwrap();

            prop_assert_eq!(witness.calculate_root(value), updated.root());
            prop_assert_eq!(witness.calculate_index(), index);
        }

        #[test]
        fn prop_other_value_gives_other_root(
            (height, index, value) in tree_case(),
            delta in 1u32..1000,
        ) {
            let tree = MerkleTree::new(height).unwrap();
            let witness = tree.get_witness(index).unwrap();
            let other = value + M31::new(delta);

            let mut updated = tree.clone();
            updated.set_leaf(index, value).unwrap();

            prop_assert_ne!(witness.calculate_root(other), updated.root());
        }

        #[test]
        fn prop_witness_valid_after_other_deposits(
            (height, index, _) in tree_case(),
            others in proptest::collection::vec(any::<u64>(), 0..8),
        ) {
            let mut tree = MerkleTree::new(height).unwrap();
            for other in others {
                let slot = other % tree.capacity();
                if slot != index {
                    tree.set_leaf(slot, SET).unwrap();
                }
            }

            let witness = tree.get_witness(index).unwrap();
            prop_assert_eq!(witness.calculate_root(UNSET), tree.root());
        }
    }
}
