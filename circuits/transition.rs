//! The public statement of a deposit: the root before and after one slot
//! flips from `UNSET` to `SET`.

use std::fmt;

use serde::{Deserialize, Serialize};
use zkdeposit_prover::{PublicInputs, M31};

use crate::digest::{Digest, DIGEST_LIMBS};
use crate::error::{CircuitError, CircuitResult};
use crate::merkle::{SET, UNSET};
use crate::witness::MerkleWitness;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionInput {
    /// Root with the slot `UNSET`
    pub pre_root: Digest,
    /// Root with the slot `SET`
    pub pos_root: Digest,
}

impl TransitionInput {
    /// An arbitrary claim. Nothing ties it to a witness until a proof is built.
    pub fn new(pre_root: Digest, pos_root: Digest) -> Self {
        Self { pre_root, pos_root }
    }

    /// The honest statement for `witness`
    pub fn from_witness(witness: &MerkleWitness) -> Self {
        Self {
            pre_root: witness.calculate_root(UNSET),
            pos_root: witness.calculate_root(SET),
        }
    }

    /// Both roots, limb by limb
    pub fn to_public_inputs(&self) -> PublicInputs {
        PublicInputs::new(self.pre_root.limbs().to_vec(), self.pos_root.limbs().to_vec())
    }

    pub fn from_public_inputs(inputs: &PublicInputs) -> CircuitResult<Self> {
        let root = |limbs: &[M31]| -> Option<Digest> {
            <[M31; DIGEST_LIMBS]>::try_from(limbs).ok().map(Digest::new)
        };
        match (root(&inputs.initial_state), root(&inputs.final_state)) {
            (Some(pre_root), Some(pos_root)) => Ok(Self::new(pre_root, pos_root)),
            _ => Err(CircuitError::InvalidProof(format!(
                "expected {} limbs per root, got {} and {}",
                DIGEST_LIMBS,
                inputs.initial_state.len(),
                inputs.final_state.len()
            ))),
        }
    }
}

impl fmt::Display for TransitionInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.pre_root, self.pos_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::MerkleTree;

    #[test]
    fn test_from_witness() {
        let mut tree = MerkleTree::new(4).unwrap();
        let witness = tree.get_witness(6).unwrap();
        let input = TransitionInput::from_witness(&witness);

        assert_eq!(input.pre_root, tree.root());
        tree.set_leaf(6, SET).unwrap();
        assert_eq!(input.pos_root, tree.root());
    }

    #[test]
    fn test_public_inputs_conversion() {
        let input = TransitionInput::new(
            Digest::from_leaf(M31::new(10)),
            Digest::from_leaf(M31::new(20)),
        );
        let inputs = input.to_public_inputs();
        assert_eq!(inputs.len(), 2 * DIGEST_LIMBS);
        assert_eq!(inputs.initial_state[0], M31::new(10));
        assert_eq!(inputs.final_state[0], M31::new(20));
        assert_eq!(TransitionInput::from_public_inputs(&inputs).unwrap(), input);

        let malformed = PublicInputs::new(vec![M31::ONE], vec![]);
        assert!(TransitionInput::from_public_inputs(&malformed).is_err());
    }
}
