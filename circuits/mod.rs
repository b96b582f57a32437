//! zkdeposit circuits
//!
//! Off-chain half of a proof-gated deposit ledger: a fixed-height Poseidon2
//! Merkle commitment with 8-limb M31 digests, inclusion witnesses, and the
//! circuit proving that one leaf slot went from [`UNSET`] to [`SET`].
//!
//! ```no_run
//! use zkdeposit::{DepositProgram, MerkleTree, ProgramConfig, TransitionInput, TREE_HEIGHT};
//!
//! let program = DepositProgram::compile(ProgramConfig::default())?;
//! let tree = MerkleTree::new(TREE_HEIGHT)?;
//! let witness = tree.get_witness(0)?;
//! let input = TransitionInput::from_witness(&witness);
//!
//! let proof = program.create_deposit_proof(&input, &witness)?;
//! proof.verify(program.verification_key())?;
//! # Ok::<(), zkdeposit::CircuitError>(())
//! ```

pub mod circuit;
pub mod config;
pub mod digest;
pub mod error;
pub mod merkle;
pub mod poseidon;
pub mod program;
pub mod proof;
pub mod transition;
pub mod witness;

// Re-exports for convenience
pub use circuit::DepositAir;
pub use config::ProgramConfig;
pub use digest::{Digest, DIGEST_LIMBS};
pub use error::{CircuitError, CircuitResult};
pub use merkle::{empty_root, MerkleTree, MAX_TREE_HEIGHT, SET, TREE_HEIGHT, UNSET};
pub use poseidon::hash2;
pub use program::{DepositProgram, VerificationKey};
pub use proof::DepositProof;
pub use transition::TransitionInput;
pub use witness::{MerkleWitness, PathStep};
pub use zkdeposit_prover::M31;
