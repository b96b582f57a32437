//! Errors raised by the off-chain circuit layer

use thiserror::Error;
use zkdeposit_prover::ProofError;

use crate::digest::Digest;
use crate::merkle::MAX_TREE_HEIGHT;

pub type CircuitResult<T> = Result<T, CircuitError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitError {
    #[error("tree height {height} outside 1..={}", MAX_TREE_HEIGHT)]
    InvalidHeight { height: usize },

    #[error("leaf index {index} out of range for {capacity} leaves")]
    IndexOutOfRange { index: u64, capacity: u64 },

    #[error("height mismatch: expected {expected}, found {found}")]
    HeightMismatch { expected: usize, found: usize },

    /// The witness does not reproduce the claimed root; no proof is built.
    #[error("witness does not reproduce {field}: claimed {claimed}, computed {computed}")]
    UnsatisfiedTransition {
        field: &'static str,
        claimed: Digest,
        computed: Digest,
    },

    /// Every trace row must be opened; fewer queries leave rows unchecked.
    #[error("{queries} queries cannot open all {rows} trace rows")]
    InsufficientQueries { queries: usize, rows: usize },

    #[error("invalid proof: {0}")]
    InvalidProof(String),

    #[error("prover error: {0}")]
    Prover(#[from] ProofError),

    #[error("serialization error: {0}")]
    Serialization(String),
}
