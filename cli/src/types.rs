//! CLI file formats

use serde::{Deserialize, Serialize};
use zkdeposit::{Digest, MerkleWitness, TransitionInput};

/// Witness file written by `witness` and read by `prove`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessFile {
    pub height: usize,
    pub index: u64,
    /// Root the witness was taken against
    pub root: Digest,
    pub witness: MerkleWitness,
}

impl WitnessFile {
    pub fn transition(&self) -> TransitionInput {
        TransitionInput::from_witness(&self.witness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkdeposit::MerkleTree;

    #[test]
    fn test_witness_file_roundtrip() {
        let tree = MerkleTree::new(4).unwrap();
        let file = WitnessFile {
            height: 4,
            index: 9,
            root: tree.root(),
            witness: tree.get_witness(9).unwrap(),
        };

        let json = serde_json::to_string(&file).unwrap();
        let back: WitnessFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.witness, file.witness);
        assert_eq!(back.root, file.root);
        assert_eq!(back.transition().pre_root, file.root);
    }
}
