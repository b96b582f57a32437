//! The compiled deposit program
//!
//! Compiling fixes the tree height and backend parameters and derives a
//! [`VerificationKey`] from them. The query count must open every trace row. Proof creation checks the witness against
//! the claimed roots first and refuses to run the backend on a false claim.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zkdeposit_prover::hash::{keccak_hash, Hash32};
use zkdeposit_prover::{ConstraintEvaluator, Prover, ProverConfig};

use crate::circuit::{trace_rows, DepositAir, NUM_COLUMNS};
use crate::config::ProgramConfig;
use crate::digest::DIGEST_LIMBS;
use crate::error::{CircuitError, CircuitResult};
use crate::merkle::{check_height, SET, UNSET};
use crate::poseidon;
use crate::proof::DepositProof;
use crate::transition::TransitionInput;
use crate::witness::MerkleWitness;

const CIRCUIT_TAG: &[u8] = b"zkdeposit/deposit-air/v2";

/// Digest binding a proof to one circuit shape and one Poseidon instance
pub fn circuit_digest(tree_height: usize) -> CircuitResult<Hash32> {
    let air = DepositAir::new(tree_height, TransitionInput::default())?;
    let num_constraints = air.constraints().len() as u32;
    Ok(keccak_hash(&[
        CIRCUIT_TAG,
        &(tree_height as u32).to_le_bytes(),
        &(DIGEST_LIMBS as u32).to_le_bytes(),
        &(NUM_COLUMNS as u32).to_le_bytes(),
        &num_constraints.to_le_bytes(),
        &poseidon::params_digest(),
    ]))
}

/// Everything a verifier needs besides the proof itself
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    pub tree_height: usize,
    pub num_queries: usize,
    pub seed_domain: Vec<u8>,
    pub circuit_digest: Hash32,
}

impl VerificationKey {
    pub fn new(config: &ProgramConfig) -> CircuitResult<Self> {
        let vk = Self {
            tree_height: config.tree_height,
            num_queries: config.prover.num_queries,
            seed_domain: config.prover.seed_domain.clone(),
            circuit_digest: circuit_digest(config.tree_height)?,
        };
        vk.check()?;
        Ok(vk)
    }

    /// Reject keys whose height is out of range or whose query count
    /// leaves trace rows unopened.
    pub fn check(&self) -> CircuitResult<()> {
        check_height(self.tree_height)?;
        let rows = trace_rows(self.tree_height);
        if self.num_queries < rows {
            return Err(CircuitError::InsufficientQueries {
                queries: self.num_queries,
                rows,
            });
        }
        Ok(())
    }

    /// Backend configuration with the transcript bound to this circuit
    pub fn prover_config(&self) -> ProverConfig {
        let mut seed_domain = self.seed_domain.clone();
        seed_domain.extend_from_slice(&self.circuit_digest);
        ProverConfig {
            num_queries: self.num_queries,
            seed_domain,
        }
    }

    /// Short identifier, e.g. for logs
    pub fn id(&self) -> String {
        hex::encode(&self.circuit_digest[..8])
    }
}

/// The deposit program: one proving and verification setup for one height
pub struct DepositProgram {
    config: ProgramConfig,
    vk: VerificationKey,
    prover: Prover,
}

impl DepositProgram {
    pub fn compile(config: ProgramConfig) -> CircuitResult<Self> {
        check_height(config.tree_height)?;
        let vk = VerificationKey::new(&config)?;
        let prover = Prover::new(vk.prover_config());
        info!(
            height = config.tree_height,
            queries = config.prover.num_queries,
            vk = %vk.id(),
            "deposit program compiled"
        );
        Ok(Self { config, vk, prover })
    }

    pub fn config(&self) -> &ProgramConfig {
        &self.config
    }

    pub fn height(&self) -> usize {
        self.config.tree_height
    }

    pub fn verification_key(&self) -> &VerificationKey {
        &self.vk
    }

    /// Prove that `witness` moves the tree from `input.pre_root` to
    /// `input.pos_root` by setting its slot.
    ///
    /// Fails with [`CircuitError::UnsatisfiedTransition`] before any proving
    /// work if either root is not the one the witness produces.
    pub fn create_deposit_proof(
        &self,
        input: &TransitionInput,
        witness: &MerkleWitness,
    ) -> CircuitResult<DepositProof> {
        if witness.height() != self.height() {
            return Err(CircuitError::HeightMismatch {
                expected: self.height(),
                found: witness.height(),
            });
        }

        for (field, leaf, claimed) in [
            ("pre_root", UNSET, input.pre_root),
            ("pos_root", SET, input.pos_root),
        ] {
            let computed = witness.calculate_root(leaf);
            if computed != claimed {
                debug!(field, %claimed, %computed, "refusing to prove false transition");
                return Err(CircuitError::UnsatisfiedTransition {
                    field,
                    claimed,
                    computed,
                });
            }
        }

        let air = DepositAir::new(self.height(), *input)?;
        let trace = air.generate_trace(witness)?;
        let proof = self
            .prover
            .prove(&air, &trace, input.to_public_inputs())?;

        info!(transition = %input, size = proof.size(), "deposit proof created");
        Ok(DepositProof::new(*input, self.height(), proof))
    }

    pub fn verify(&self, proof: &DepositProof) -> CircuitResult<()> {
        proof.verify(&self.vk)
    }
}
