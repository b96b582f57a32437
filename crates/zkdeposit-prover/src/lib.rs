//! zkdeposit prover - transition proofs over an M31 execution trace
//!
//! This crate is the proof backend used by the `zkdeposit` circuits. A
//! circuit describes itself as an AIR (a trace shape plus transition
//! constraints); the prover commits to the trace rows with a Keccak Merkle
//! tree, derives query rows by Fiat-Shamir, and opens each queried row
//! together with its successor. The verifier re-evaluates every constraint on
//! the opened rows.
//!
//! # Features
//!
//! - `serde` - Serialize/Deserialize for field elements and proof types
//!
//! # Components
//!
//! - `m31` - Mersenne-31 field implementation
//! - `hash` - Keccak helpers and hash-to-field derivation
//! - `merkle` - Keccak256 row commitment with opening paths
//! - `air` - Trace, evaluation frames and the constraint evaluator trait
//! - `prover` - Proof generation and the Fiat-Shamir transcript
//! - `verifier` - Proof verification
//! - `types` - Common types (Proof, PublicInputs, errors)

pub mod m31;
pub mod hash;
pub mod merkle;
pub mod air;
pub mod prover;
pub mod verifier;
pub mod types;

// Re-exports for convenience
pub use m31::{M31, M31_PRIME};
pub use merkle::{Hash, MerkleCommitment, MerklePath};
pub use air::{AirConfig, Constraint, ConstraintEvaluator, EvaluationFrame, Trace, TraceColumn};
pub use prover::{Prover, ProverConfig, Transcript};
pub use verifier::{VerificationError, Verifier};
pub use types::{Proof, ProofError, PublicInputs};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::air::{ConstraintEvaluator, EvaluationFrame, Trace};
    pub use crate::m31::{M31, M31_PRIME};
    pub use crate::merkle::{MerkleCommitment, MerklePath};
    pub use crate::prover::{Prover, ProverConfig};
    pub use crate::types::{Proof, PublicInputs};
    pub use crate::verifier::Verifier;
}
