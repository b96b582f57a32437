//! Compile-time parameters of the deposit program

use zkdeposit_prover::ProverConfig;

use crate::merkle::TREE_HEIGHT;

/// Parameters fixed when the program is compiled. Proofs built under one
/// configuration only verify under the same one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramConfig {
    /// Merkle tree height
    pub tree_height: usize,
    /// Query count and transcript domain of the proof backend. The query
    /// count must cover every trace row.
    pub prover: ProverConfig,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            tree_height: TREE_HEIGHT,
            prover: ProverConfig::default(),
        }
    }
}

impl ProgramConfig {
    pub fn with_height(mut self, tree_height: usize) -> Self {
        self.tree_height = tree_height;
        self
    }
}
