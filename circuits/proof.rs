//! Deposit proofs: a backend proof tagged with the transition it attests to

use serde::{Deserialize, Serialize};
use zkdeposit_prover::{Proof, Verifier};

use crate::circuit::DepositAir;
use crate::digest::{Digest, DIGEST_BYTES};
use crate::error::{CircuitError, CircuitResult};
use crate::program::VerificationKey;
use crate::transition::TransitionInput;

const DEPOSIT_PROOF_MAGIC: &[u8; 4] = b"ZKDD";
const DEPOSIT_PROOF_VERSION: u8 = 2;
const PRE_ROOT_OFFSET: usize = 9;
const POS_ROOT_OFFSET: usize = PRE_ROOT_OFFSET + DIGEST_BYTES;
const HEADER_LEN: usize = POS_ROOT_OFFSET + DIGEST_BYTES;

/// Proof that one slot of a tree moved from `UNSET` to `SET`, taking the
/// root from `input.pre_root` to `input.pos_root`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositProof {
    input: TransitionInput,
    tree_height: usize,
    proof: Proof,
}

impl DepositProof {
    pub(crate) fn new(input: TransitionInput, tree_height: usize, proof: Proof) -> Self {
        Self {
            input,
            tree_height,
            proof,
        }
    }

    /// The public statement
    pub fn public_input(&self) -> &TransitionInput {
        &self.input
    }

    pub fn pre_root(&self) -> Digest {
        self.input.pre_root
    }

    pub fn pos_root(&self) -> Digest {
        self.input.pos_root
    }

    pub fn tree_height(&self) -> usize {
        self.tree_height
    }

    pub fn inner(&self) -> &Proof {
        &self.proof
    }

    /// Check the proof against a verification key.
    ///
    /// Pure: no state is read or written. Every failure is reported as
    /// [`CircuitError::InvalidProof`], including a key that would leave
    /// trace rows unopened.
    pub fn verify(&self, vk: &VerificationKey) -> CircuitResult<()> {
        vk.check()
            .map_err(|e| CircuitError::InvalidProof(e.to_string()))?;
        if self.tree_height != vk.tree_height {
            return Err(CircuitError::InvalidProof(format!(
                "proof for height {}, key for height {}",
                self.tree_height, vk.tree_height
            )));
        }
        if self.proof.public_inputs != self.input.to_public_inputs() {
            return Err(CircuitError::InvalidProof(
                "public inputs do not match the stated transition".into(),
            ));
        }

        let air = DepositAir::new(self.tree_height, self.input)
            .map_err(|e| CircuitError::InvalidProof(e.to_string()))?;
        Verifier::new(vk.prover_config())
            .verify(&air, &self.proof)
            .map_err(|e| CircuitError::InvalidProof(e.to_string()))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let inner = self.proof.to_bytes();
        let mut bytes = Vec::with_capacity(HEADER_LEN + inner.len());
        bytes.extend_from_slice(DEPOSIT_PROOF_MAGIC);
        bytes.push(DEPOSIT_PROOF_VERSION);
        bytes.extend_from_slice(&(self.tree_height as u32).to_le_bytes());
        bytes.extend_from_slice(&self.input.pre_root.to_bytes());
        bytes.extend_from_slice(&self.input.pos_root.to_bytes());
        bytes.extend_from_slice(&inner);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> CircuitResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(CircuitError::Serialization(format!(
                "need at least {} bytes, got {}",
                HEADER_LEN,
                bytes.len()
            )));
        }
        let (header, inner) = bytes.split_at(HEADER_LEN);
        if &header[..4] != DEPOSIT_PROOF_MAGIC {
            return Err(CircuitError::Serialization("bad magic".into()));
        }
        if header[4] != DEPOSIT_PROOF_VERSION {
            return Err(CircuitError::Serialization(format!(
                "unsupported version {}",
                header[4]
            )));
        }

        let tree_height = u32::from_le_bytes([header[5], header[6], header[7], header[8]]) as usize;
        let root = |offset: usize| {
            Digest::from_bytes(&header[offset..offset + DIGEST_BYTES])
                .ok_or_else(|| CircuitError::Serialization("non-canonical root".into()))
        };
        let input = TransitionInput::new(root(PRE_ROOT_OFFSET)?, root(POS_ROOT_OFFSET)?);
        let proof =
            Proof::from_bytes(inner).map_err(|e| CircuitError::Serialization(e.to_string()))?;

        Ok(Self::new(input, tree_height, proof))
    }
}
