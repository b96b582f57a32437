//! Proof verification
//!
//! The verifier replays the transcript to recover the query order, checks
//! every opening against the trace root, and evaluates the AIR on each opened
//! frame. It only accepts proofs that open every row: a row it never sees is
//! a row whose constraints it never checks.

use thiserror::Error;
use tracing::{debug, warn};

use crate::air::{constraint_name, ConstraintEvaluator, EvaluationFrame};
use crate::merkle::{Hash, MerkleCommitment};
use crate::prover::{ProverConfig, QueryProof, Transcript};
use crate::types::Proof;

/// Verifier for trace proofs
pub struct Verifier {
    config: ProverConfig,
}

impl Verifier {
    pub fn new(config: ProverConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ProverConfig::default())
    }

    /// Verify a proof
    pub fn verify<E: ConstraintEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        proof: &Proof,
    ) -> Result<(), VerificationError> {
        let result = self.verify_inner(evaluator, proof);
        if let Err(err) = &result {
            warn!(error = %err, "proof rejected");
        }
        result
    }

    fn verify_inner<E: ConstraintEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        proof: &Proof,
    ) -> Result<(), VerificationError> {
        // Step 1: shape
        let air = evaluator.config();
        if proof.log_trace_length != air.log_trace_length {
            return Err(VerificationError::TraceLengthMismatch {
                expected: air.log_trace_length,
                found: proof.log_trace_length,
            });
        }
        if proof.public_inputs.len() != air.num_public_inputs {
            return Err(VerificationError::PublicInputsMismatch);
        }
        let num_rows = air.trace_length();
        if !self.config.covers(num_rows) {
            return Err(VerificationError::InsufficientQueries {
                queries: self.config.num_queries,
                rows: num_rows,
            });
        }

        // Step 2: rebuild transcript
        let mut transcript = Transcript::new(&self.config.seed_domain);
        transcript.append(&proof.public_inputs.hash());
        transcript.append(&proof.trace_root);
        transcript.append_u64(proof.log_trace_length as u64);
        let query_indices = transcript.challenge_indices(num_rows, num_rows);

        if proof.query_proofs.len() != query_indices.len() {
            return Err(VerificationError::QueryCountMismatch {
                expected: query_indices.len(),
                found: proof.query_proofs.len(),
            });
        }

        // Step 3: openings and constraints at every query
        let constraints = evaluator.constraints();
        for (query, &expected_index) in proof.query_proofs.iter().zip(&query_indices) {
            self.verify_query(query, &proof.trace_root, expected_index, num_rows, air.num_columns)?;

            let frame = EvaluationFrame::new(
                query.index,
                num_rows,
                query.current.values.clone(),
                query.next.values.clone(),
            );
            let evals = evaluator.evaluate(&frame);
            if evals.len() != constraints.len() {
                return Err(VerificationError::ConstraintMismatch {
                    row: query.index,
                    constraint: format!("expected {} evaluations", constraints.len()),
                });
            }
            if let Some(i) = evals.iter().position(|e| !e.is_zero()) {
                return Err(VerificationError::ConstraintMismatch {
                    row: query.index,
                    constraint: constraint_name(&constraints, i),
                });
            }
        }

        debug!(queries = query_indices.len(), "proof verified");
        Ok(())
    }

    /// Verify a single query proof
    fn verify_query(
        &self,
        query: &QueryProof,
        trace_root: &Hash,
        expected_index: usize,
        num_rows: usize,
        num_columns: usize,
    ) -> Result<(), VerificationError> {
        if query.index != expected_index {
            return Err(VerificationError::QueryIndexMismatch);
        }

        let next_index = (query.index + 1) % num_rows;
        for (index, opening) in [(query.index, &query.current), (next_index, &query.next)] {
            if opening.values.len() != num_columns {
                return Err(VerificationError::RowWidthMismatch(index));
            }
            if !MerkleCommitment::verify_opening(trace_root, index, &opening.values, &opening.path) {
                return Err(VerificationError::TraceOpeningInvalid(index));
            }
        }

        Ok(())
    }
}

/// Verification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("Trace length mismatch: expected 2^{expected} rows, proof has 2^{found}")]
    TraceLengthMismatch { expected: u32, found: u32 },
    #[error("{queries} queries cannot open all {rows} trace rows")]
    InsufficientQueries { queries: usize, rows: usize },
    #[error("Public inputs do not match the AIR")]
    PublicInputsMismatch,
    #[error("Query count mismatch: expected {expected}, found {found}")]
    QueryCountMismatch { expected: usize, found: usize },
    #[error("Query index mismatch")]
    QueryIndexMismatch,
    #[error("Opened row {0} has the wrong width")]
    RowWidthMismatch(usize),
    #[error("Trace opening invalid at row {0}")]
    TraceOpeningInvalid(usize),
    #[error("Constraint `{constraint}` not satisfied at row {row}")]
    ConstraintMismatch { row: usize, constraint: String },
}
