//! Tree node digests
//!
//! A node is eight M31 limbs (248 bits). A single field element would leave
//! roots open to birthday collisions after ~2^16 hashes.

use std::fmt;

use serde::{Deserialize, Serialize};
use zkdeposit_prover::M31;

/// Limbs per digest
pub const DIGEST_LIMBS: usize = 8;

/// Encoded size of a digest
pub const DIGEST_BYTES: usize = DIGEST_LIMBS * 4;

/// A Merkle node, leaf or root
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Digest([M31; DIGEST_LIMBS]);

impl Digest {
    pub const fn new(limbs: [M31; DIGEST_LIMBS]) -> Self {
        Self(limbs)
    }

    /// Embed a leaf value: the value in limb 0, zeros elsewhere
    pub const fn from_leaf(value: M31) -> Self {
        let mut limbs = [M31::ZERO; DIGEST_LIMBS];
        limbs[0] = value;
        Self(limbs)
    }

    pub fn limbs(&self) -> &[M31; DIGEST_LIMBS] {
        &self.0
    }

    pub fn to_bytes(&self) -> [u8; DIGEST_BYTES] {
        let mut bytes = [0u8; DIGEST_BYTES];
        for (chunk, limb) in bytes.chunks_exact_mut(4).zip(self.0.iter()) {
            chunk.copy_from_slice(&limb.to_le_bytes());
        }
        bytes
    }

    /// Decode from exactly [`DIGEST_BYTES`] bytes. Rejects non-canonical limbs.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != DIGEST_BYTES {
            return None;
        }
        let mut limbs = [M31::ZERO; DIGEST_LIMBS];
        for (limb, chunk) in limbs.iter_mut().zip(bytes.chunks_exact(4)) {
            let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            *limb = M31::try_from_canonical(word)?;
        }
        Some(Self(limbs))
    }
}

impl From<[M31; DIGEST_LIMBS]> for Digest {
    fn from(limbs: [M31; DIGEST_LIMBS]) -> Self {
        Self(limbs)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_bytes()))
    }
}
