//! Inclusion witness: the path from one leaf slot to the root

use serde::{Deserialize, Serialize};
use zkdeposit_prover::M31;

use crate::digest::Digest;
use crate::poseidon::hash2;

/// One level of a Merkle path
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    /// Digest of the other child at this level
    pub sibling: Digest,
    /// Whether the running node is the left child at this level
    pub is_left: bool,
}

/// Sibling hashes and directions from leaf (level 0) to root
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleWitness {
    steps: Vec<PathStep>,
}

impl MerkleWitness {
    pub fn new(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    pub fn height(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn siblings(&self) -> impl Iterator<Item = Digest> + '_ {
        self.steps.iter().map(|s| s.sibling)
    }

    /// Direction bits as field elements, 1 where the running node is a right child
    pub fn path_bits(&self) -> impl Iterator<Item = M31> + '_ {
        self.steps.iter().map(|s| M31::from(!s.is_left))
    }

    /// Root of the tree in which this slot holds `leaf`
    pub fn calculate_root(&self, leaf: M31) -> Digest {
        self.steps.iter().fold(Digest::from_leaf(leaf), |current, step| {
            if step.is_left {
                hash2(&current, &step.sibling)
            } else {
                hash2(&step.sibling, &current)
            }
        })
    }

    /// Leaf index encoded by the direction bits
    pub fn calculate_index(&self) -> u64 {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, step)| !step.is_left)
            .fold(0u64, |index, (level, _)| index | (1 << level))
    }
}
