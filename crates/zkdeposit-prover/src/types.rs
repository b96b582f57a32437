//! Common types for the prover
//!
//! Defines Proof, PublicInputs, and the proof-generation error, plus the
//! binary encoding of a proof.

use thiserror::Error;

use crate::m31::M31;
use crate::merkle::{Hash, MerklePath, HASH_SIZE};
use crate::prover::{QueryProof, RowOpening};

/// Leading bytes of every encoded proof
pub const PROOF_MAGIC: &[u8; 4] = b"ZKDP";

/// Encoding version
pub const PROOF_VERSION: u8 = 1;

/// A transition proof
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Proof {
    /// Merkle root over the trace rows
    pub trace_root: Hash,
    /// Log2 of the number of trace rows
    pub log_trace_length: u32,
    /// Query proofs (row openings at sampled positions)
    pub query_proofs: Vec<QueryProof>,
    /// Public inputs
    pub public_inputs: PublicInputs,
}

impl Proof {
    /// Serialize the proof to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size());

        bytes.extend_from_slice(PROOF_MAGIC);
        bytes.push(PROOF_VERSION);
        bytes.extend_from_slice(&self.trace_root);
        bytes.extend_from_slice(&self.log_trace_length.to_le_bytes());
        bytes.extend_from_slice(&self.public_inputs.to_bytes());

        bytes.extend_from_slice(&(self.query_proofs.len() as u32).to_le_bytes());
        for query in &self.query_proofs {
            bytes.extend_from_slice(&(query.index as u32).to_le_bytes());
            write_opening(&mut bytes, &query.current);
            write_opening(&mut bytes, &query.next);
        }

        bytes
    }

    /// Decode a proof produced by [`Proof::to_bytes`].
    ///
    /// Truncated input, trailing bytes, and non-canonical field elements are
    /// all rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofError> {
        let mut reader = ByteReader::new(bytes);

        if reader.take(4)? != PROOF_MAGIC {
            return Err(ProofError::serialization("bad magic"));
        }
        let version = reader.read_u8()?;
        if version != PROOF_VERSION {
            return Err(ProofError::serialization(format!(
                "unsupported version {}",
                version
            )));
        }

        let trace_root = reader.read_hash()?;
        let log_trace_length = reader.read_u32()?;
        let initial_state = reader.read_m31_vec()?;
        let final_state = reader.read_m31_vec()?;

        // index + two empty openings is the smallest possible query
        let num_queries = reader.read_len(4 + 2 * 12)?;
        let mut query_proofs = Vec::with_capacity(num_queries);
        for _ in 0..num_queries {
            let index = reader.read_u32()? as usize;
            let current = read_opening(&mut reader)?;
            let next = read_opening(&mut reader)?;
            query_proofs.push(QueryProof {
                index,
                current,
                next,
            });
        }

        reader.finish()?;

        Ok(Self {
            trace_root,
            log_trace_length,
            query_proofs,
            public_inputs: PublicInputs::new(initial_state, final_state),
        })
    }

    /// Encoded proof size in bytes
    pub fn size(&self) -> usize {
        let opening_size = |o: &RowOpening| 12 + o.values.len() * 4 + o.path.depth() * HASH_SIZE;
        let queries: usize = self
            .query_proofs
            .iter()
            .map(|q| 4 + opening_size(&q.current) + opening_size(&q.next))
            .sum();

        PROOF_MAGIC.len() + 1 + HASH_SIZE + 4 + self.public_inputs.to_bytes().len() + 4 + queries
    }
}

fn write_opening(bytes: &mut Vec<u8>, opening: &RowOpening) {
    bytes.extend_from_slice(&(opening.values.len() as u32).to_le_bytes());
    for v in &opening.values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes.extend_from_slice(&(opening.path.leaf_index as u32).to_le_bytes());
    bytes.extend_from_slice(&(opening.path.siblings.len() as u32).to_le_bytes());
    for sibling in &opening.path.siblings {
        bytes.extend_from_slice(sibling);
    }
}

fn read_opening(reader: &mut ByteReader<'_>) -> Result<RowOpening, ProofError> {
    let values = reader.read_m31_vec()?;
    let leaf_index = reader.read_u32()? as usize;
    let num_siblings = reader.read_len(HASH_SIZE)?;
    let siblings = (0..num_siblings)
        .map(|_| reader.read_hash())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RowOpening {
        values,
        path: MerklePath {
            siblings,
            leaf_index,
        },
    })
}

/// Cursor over an encoded proof
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProofError> {
        if self.remaining() < n {
            return Err(ProofError::serialization(format!(
                "unexpected end of input at byte {}",
                self.pos
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, ProofError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, ProofError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn read_hash(&mut self) -> Result<Hash, ProofError> {
        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(self.take(HASH_SIZE)?);
        Ok(hash)
    }

    fn read_m31(&mut self) -> Result<M31, ProofError> {
        let raw = self.read_u32()?;
        M31::try_from_canonical(raw)
            .ok_or_else(|| ProofError::serialization(format!("non-canonical field element {}", raw)))
    }

    /// Read a length prefix, rejecting lengths the remaining input cannot hold.
    fn read_len(&mut self, min_item_size: usize) -> Result<usize, ProofError> {
        let len = self.read_u32()? as usize;
        if len.saturating_mul(min_item_size) > self.remaining() {
            return Err(ProofError::serialization(format!(
                "length {} exceeds remaining input",
                len
            )));
        }
        Ok(len)
    }

    fn read_m31_vec(&mut self) -> Result<Vec<M31>, ProofError> {
        let len = self.read_len(4)?;
        (0..len).map(|_| self.read_m31()).collect()
    }

    fn finish(self) -> Result<(), ProofError> {
        if self.remaining() != 0 {
            return Err(ProofError::serialization(format!(
                "{} trailing bytes",
                self.remaining()
            )));
        }
        Ok(())
    }
}

/// Public inputs to the proof
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PublicInputs {
    /// Initial state values
    pub initial_state: Vec<M31>,
    /// Final state values
    pub final_state: Vec<M31>,
}

impl PublicInputs {
    pub fn new(initial_state: Vec<M31>, final_state: Vec<M31>) -> Self {
        Self {
            initial_state,
            final_state,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.initial_state.is_empty() && self.final_state.is_empty()
    }

    /// Total number of public field elements
    pub fn len(&self) -> usize {
        self.initial_state.len() + self.final_state.len()
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + 4 * self.len());

        bytes.extend_from_slice(&(self.initial_state.len() as u32).to_le_bytes());
        for val in &self.initial_state {
            bytes.extend_from_slice(&val.to_le_bytes());
        }

        bytes.extend_from_slice(&(self.final_state.len() as u32).to_le_bytes());
        for val in &self.final_state {
            bytes.extend_from_slice(&val.to_le_bytes());
        }

        bytes
    }

    /// Hash the public inputs
    pub fn hash(&self) -> Hash {
        crate::merkle::hash_bytes(&self.to_bytes())
    }
}

/// Proof generation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    /// Trace shape does not match the AIR
    #[error("Invalid trace: {0}")]
    InvalidTrace(String),
    /// At least one constraint is non-zero somewhere in the trace
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    /// A committed row could not be opened
    #[error("Merkle error: {0}")]
    MerkleError(String),
    /// Malformed proof encoding
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// The configuration would leave some rows unopened
    #[error("{queries} queries cannot open all {rows} trace rows")]
    InsufficientQueries { queries: usize, rows: usize },
}

impl ProofError {
    pub fn invalid_trace(msg: impl Into<String>) -> Self {
        Self::InvalidTrace(msg.into())
    }

    pub fn constraint_violation(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}
