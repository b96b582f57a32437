//! Proof generation
//!
//! The prover checks that the trace satisfies the AIR, commits to its rows,
//! and answers Fiat-Shamir queries by opening each queried row together with
//! the row after it.
//!
//! Constraints are only ever evaluated on opened rows, so a proof must open
//! every row of the trace. Configurations with fewer queries than rows are
//! refused on both sides.

use tracing::{debug, info};

use crate::air::{verify_constraints, ConstraintEvaluator, Trace};
use crate::m31::M31;
use crate::merkle::{hash_bytes, Hash, MerkleCommitment, MerklePath};
use crate::types::{Proof, ProofError, PublicInputs};

/// Default transcript domain tag
pub const DEFAULT_SEED_DOMAIN: &[u8] = b"zkdeposit-prover-v1";

/// Prover configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProverConfig {
    /// Number of queried rows. Must be at least the trace length for a proof
    /// to be produced or accepted.
    pub num_queries: usize,
    /// Domain tag seeding the Fiat-Shamir transcript
    pub seed_domain: Vec<u8>,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ProverConfig {
    pub fn new(num_queries: usize) -> Self {
        Self {
            num_queries,
            seed_domain: DEFAULT_SEED_DOMAIN.to_vec(),
        }
    }

    /// High security configuration
    pub fn high_security() -> Self {
        Self::new(256)
    }

    /// Whether every row of a `num_rows` trace gets opened
    pub fn covers(&self, num_rows: usize) -> bool {
        self.num_queries >= num_rows
    }
}

/// Trace prover
pub struct Prover {
    config: ProverConfig,
}

impl Prover {
    pub fn new(config: ProverConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ProverConfig::default())
    }

    pub fn config(&self) -> &ProverConfig {
        &self.config
    }

    /// Generate a proof for the given trace and constraints
    ///
    /// Fails without producing a proof when the trace does not match the
    /// AIR's shape or any constraint is non-zero on any row.
    pub fn prove<E: ConstraintEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        trace: &Trace,
        public_inputs: PublicInputs,
    ) -> Result<Proof, ProofError> {
        check_shape(evaluator, trace, &public_inputs)?;
        if !self.config.covers(trace.num_rows) {
            return Err(ProofError::InsufficientQueries {
                queries: self.config.num_queries,
                rows: trace.num_rows,
            });
        }

        // Step 1: refuse unsatisfied traces
        verify_constraints(evaluator, trace).map_err(|failures| {
            let (row, name) = &failures[0];
            ProofError::constraint_violation(format!(
                "{} failing evaluations, first `{}` at row {}",
                failures.len(),
                name,
                row
            ))
        })?;

        // Step 2: commit to trace rows
        let commitment = MerkleCommitment::commit_rows(trace.rows());
        let trace_root = commitment.root();
        debug!(
            rows = trace.num_rows,
            columns = trace.num_columns(),
            root = %hex::encode(trace_root),
            "committed trace"
        );

        // Step 3: derive query rows from the transcript
        let log_trace_length = trace.log_length();
        let mut transcript = Transcript::new(&self.config.seed_domain);
        transcript.append(&public_inputs.hash());
        transcript.append(&trace_root);
        transcript.append_u64(log_trace_length as u64);
        let query_indices = transcript.challenge_indices(trace.num_rows, trace.num_rows);

        // Step 4: open each queried row and its successor
        let query_proofs = query_indices
            .iter()
            .map(|&index| {
                Ok(QueryProof {
                    index,
                    current: open_row(&commitment, index)?,
                    next: open_row(&commitment, (index + 1) % trace.num_rows)?,
                })
            })
            .collect::<Result<Vec<_>, ProofError>>()?;

        info!(
            rows = trace.num_rows,
            queries = query_proofs.len(),
            "proof generated"
        );

        Ok(Proof {
            trace_root,
            log_trace_length,
            query_proofs,
            public_inputs,
        })
    }
}

fn check_shape<E: ConstraintEvaluator + ?Sized>(
    evaluator: &E,
    trace: &Trace,
    public_inputs: &PublicInputs,
) -> Result<(), ProofError> {
    let config = evaluator.config();

    if trace.num_rows != config.trace_length() {
        return Err(ProofError::invalid_trace(format!(
            "expected {} rows, got {}",
            config.trace_length(),
            trace.num_rows
        )));
    }
    if trace.num_columns() != config.num_columns {
        return Err(ProofError::invalid_trace(format!(
            "expected {} columns, got {}",
            config.num_columns,
            trace.num_columns()
        )));
    }
    if trace.columns.iter().any(|c| c.values.len() != trace.num_rows) {
        return Err(ProofError::invalid_trace("ragged columns"));
    }
    if public_inputs.len() != config.num_public_inputs {
        return Err(ProofError::invalid_trace(format!(
            "expected {} public inputs, got {}",
            config.num_public_inputs,
            public_inputs.len()
        )));
    }

    Ok(())
}

fn open_row(commitment: &MerkleCommitment, index: usize) -> Result<RowOpening, ProofError> {
    commitment
        .open(index)
        .map(|(values, path)| RowOpening { values, path })
        .ok_or_else(|| ProofError::MerkleError(format!("row {} out of range", index)))
}

/// One opened trace row
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowOpening {
    /// Row values
    pub values: Vec<M31>,
    /// Authentication path to the trace root
    pub path: MerklePath,
}

/// A query proof (a row and its successor)
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueryProof {
    /// Query index
    pub index: usize,
    /// Opening of row `index`
    pub current: RowOpening,
    /// Opening of row `index + 1` (wrapping)
    pub next: RowOpening,
}

/// Transcript for Fiat-Shamir transformation
pub struct Transcript {
    state: Hash,
    counter: u64,
}

impl Transcript {
    pub fn new(domain: &[u8]) -> Self {
        Self {
            state: hash_bytes(domain),
            counter: 0,
        }
    }

    /// Append data to the transcript
    pub fn append(&mut self, data: &Hash) {
        let mut combined = [0u8; 64];
        combined[..32].copy_from_slice(&self.state);
        combined[32..].copy_from_slice(data);
        self.state = hash_bytes(&combined);
    }

    pub fn append_u64(&mut self, value: u64) {
        let mut combined = [0u8; 40];
        combined[..32].copy_from_slice(&self.state);
        combined[32..].copy_from_slice(&value.to_le_bytes());
        self.state = hash_bytes(&combined);
    }

    /// Get a challenge scalar
    pub fn challenge_scalar(&mut self) -> M31 {
        self.counter += 1;
        let mut data = [0u8; 40];
        data[..32].copy_from_slice(&self.state);
        data[32..40].copy_from_slice(&self.counter.to_le_bytes());

        let hash = hash_bytes(&data);
        let value = u32::from_le_bytes([hash[0], hash[1], hash[2], hash[3]]);
        M31::new(value)
    }

    /// Get `count` distinct indices in `[0, max)`.
    ///
    /// `count` is clamped to `max`, so the sampling always terminates.
    pub fn challenge_indices(&mut self, count: usize, max: usize) -> Vec<usize> {
        let count = count.min(max);
        let mut indices = Vec::with_capacity(count);

        while indices.len() < count {
            let index = (self.challenge_scalar().value() as usize) % max;
            if !indices.contains(&index) {
                indices.push(index);
            }
        }

        indices
    }

    /// Get current state hash
    pub fn state(&self) -> Hash {
        self.state
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(DEFAULT_SEED_DOMAIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prover_config() {
        let config = ProverConfig::default();
        assert_eq!(config.num_queries, 64);
        assert!(config.covers(32));
        assert!(!ProverConfig::new(16).covers(32));
        assert!(ProverConfig::high_security().covers(256));
    }

    #[test]
    fn test_transcript() {
        let mut transcript1 = Transcript::default();
        let mut transcript2 = Transcript::default();

        let hash = hash_bytes(b"test data");
        transcript1.append(&hash);
        transcript2.append(&hash);

        assert_eq!(transcript1.state(), transcript2.state());
        assert_eq!(transcript1.challenge_scalar(), transcript2.challenge_scalar());
    }

    #[test]
    fn test_transcript_domain_separation() {
        let mut transcript1 = Transcript::new(b"a");
        let mut transcript2 = Transcript::new(b"b");

        assert_ne!(transcript1.challenge_scalar(), transcript2.challenge_scalar());
    }

    #[test]
    fn test_challenge_indices() {
        let mut transcript = Transcript::default();
        let indices = transcript.challenge_indices(10, 100);

        assert_eq!(indices.len(), 10);
        assert!(indices.iter().all(|&idx| idx < 100));

        let mut sorted = indices.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 10);
    }

    #[test]
    fn test_challenge_indices_clamped_covers_all_rows() {
        let mut transcript = Transcript::default();
        let mut indices = transcript.challenge_indices(100, 8);
        indices.sort();
        assert_eq!(indices, (0..8).collect::<Vec<_>>());
    }
}
