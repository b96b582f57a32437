//! Keccak256 trace commitment
//!
//! A binary Merkle tree over hashed trace rows. The prover commits to every
//! row of the execution trace and later opens the rows the verifier queries.

use sha3::{Digest, Keccak256};

use crate::m31::M31;

/// Hash output size in bytes
pub const HASH_SIZE: usize = 32;

/// A 32-byte hash value
pub type Hash = [u8; HASH_SIZE];

/// Zero hash (32 zero bytes)
pub const ZERO_HASH: Hash = [0u8; HASH_SIZE];

/// Hash two child hashes together to form a parent hash
#[inline]
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(left);
    hasher.update(right);
    finalize(hasher)
}

/// Hash one trace row into a leaf.
pub fn hash_row(values: &[M31]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update((values.len() as u32).to_le_bytes());
    #[cfg(target_endian = "little")]
    hasher.update(bytemuck::cast_slice::<M31, u8>(values));
    #[cfg(not(target_endian = "little"))]
    for v in values {
        hasher.update(v.to_le_bytes());
    }
    finalize(hasher)
}

/// Hash arbitrary bytes
pub fn hash_bytes(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    finalize(hasher)
}

#[inline]
fn finalize(hasher: Keccak256) -> Hash {
    let result = hasher.finalize();
    let mut hash = [0u8; HASH_SIZE];
    hash.copy_from_slice(&result);
    hash
}

/// A Merkle authentication path (sibling hashes from leaf to root)
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MerklePath {
    /// Sibling hashes at each level (from leaf to root)
    pub siblings: Vec<Hash>,
    /// Leaf index
    pub leaf_index: usize,
}

impl MerklePath {
    /// Verify this path against a leaf and root
    pub fn verify(&self, leaf_hash: &Hash, root: &Hash) -> bool {
        &self.compute_root(leaf_hash) == root
    }

    /// Compute the root from a leaf hash using this path
    pub fn compute_root(&self, leaf_hash: &Hash) -> Hash {
        let mut current = *leaf_hash;
        let mut index = self.leaf_index;

        for sibling in &self.siblings {
            current = if index & 1 == 0 {
                hash_pair(&current, sibling)
            } else {
                hash_pair(sibling, &current)
            };
            index >>= 1;
        }

        current
    }

    /// Get the depth of this path
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }
}

/// Build a Merkle tree from a non-empty, power-of-two slice of leaf hashes.
///
/// Returns every level, leaves first; the last level holds the root alone.
pub fn build_tree(leaves: &[Hash]) -> Vec<Vec<Hash>> {
    debug_assert!(leaves.len().is_power_of_two());

    let mut levels = vec![leaves.to_vec()];
    while let Some(current) = levels.last().filter(|level| level.len() > 1) {
        let next: Vec<Hash> = current
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
        levels.push(next);
    }

    levels
}

/// Commitment to the rows of an execution trace
#[derive(Clone, Debug)]
pub struct MerkleCommitment {
    rows: Vec<Vec<M31>>,
    levels: Vec<Vec<Hash>>,
}

impl MerkleCommitment {
    /// Commit to trace rows. The row count must be a power of two.
    pub fn commit_rows(rows: Vec<Vec<M31>>) -> Self {
        let leaves: Vec<Hash> = rows.iter().map(|row| hash_row(row)).collect();
        let levels = build_tree(&leaves);
        Self { rows, levels }
    }

    /// Get the root hash
    pub fn root(&self) -> Hash {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or(ZERO_HASH)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Open the commitment at a specific row
    pub fn open(&self, index: usize) -> Option<(Vec<M31>, MerklePath)> {
        let row = self.rows.get(index)?.clone();

        let mut siblings = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            siblings.push(level[idx ^ 1]);
            idx >>= 1;
        }

        Some((
            row,
            MerklePath {
                siblings,
                leaf_index: index,
            },
        ))
    }

    /// Check an opened row against a committed root
    pub fn verify_opening(root: &Hash, index: usize, row: &[M31], path: &MerklePath) -> bool {
        index == path.leaf_index && path.verify(&hash_row(row), root)
    }
}
