//! Poseidon2 permutation over M31
//!
//! Width-16 permutation with an x^5 S-box: 4 full rounds, 14 partial rounds,
//! 4 full rounds. Full rounds mix with the block-circulant external matrix
//! built from the 4x4 `M4`; partial rounds use the cheap internal matrix
//! `1 + diag(V)`. The state is mixed once by the external matrix before the
//! first round.
//!
//! The Merkle tree compresses two children with [`hash2`]: both 8-limb
//! digests fill the state, the permutation runs, and the first 8 lanes are
//! the parent. The transition circuit re-states every round as a constraint
//! via [`round_function`].
//!
//! Round constants are expanded from a fixed domain tag with keccak, so any
//! party can regenerate them.

use std::sync::OnceLock;

use zkdeposit_prover::hash::{derive_field_elements, keccak_hash, Hash32};
use zkdeposit_prover::M31;

use crate::digest::{Digest, DIGEST_LIMBS};

/// Poseidon2 state width
pub const STATE_WIDTH: usize = 2 * DIGEST_LIMBS;

/// Number of full rounds, split evenly around the partial rounds
pub const FULL_ROUNDS: usize = 8;

/// Number of partial rounds
pub const PARTIAL_ROUNDS: usize = 14;

pub const TOTAL_ROUNDS: usize = FULL_ROUNDS + PARTIAL_ROUNDS;

const ROUND_CONSTANT_DOMAIN: &[u8] = b"zkdeposit/poseidon2-m31/t16/round-constants";

/// 4x4 block of the external matrix
const M4: [[u32; 4]; 4] = [[5, 7, 1, 3], [4, 6, 1, 1], [1, 3, 5, 7], [1, 1, 4, 6]];

/// Internal diagonal `V = [-2, 2^s1, 2^s2, ...]`; lane 0 is -2, the rest
/// are powers of two with these exponents.
const INTERNAL_DIAG_SHIFTS: [u32; STATE_WIDTH - 1] =
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 12, 13, 14, 15, 16];

pub type State = [M31; STATE_WIDTH];

fn round_constants() -> &'static [State; TOTAL_ROUNDS] {
    static CONSTANTS: OnceLock<[State; TOTAL_ROUNDS]> = OnceLock::new();
    CONSTANTS.get_or_init(|| {
        let flat = derive_field_elements(ROUND_CONSTANT_DOMAIN, TOTAL_ROUNDS * STATE_WIDTH);
        let mut constants = [[M31::ZERO; STATE_WIDTH]; TOTAL_ROUNDS];
        for (i, c) in flat.into_iter().enumerate() {
            constants[i / STATE_WIDTH][i % STATE_WIDTH] = c;
        }
        constants
    })
}

fn internal_diag() -> State {
    let mut diag = [M31::ZERO; STATE_WIDTH];
    diag[0] = -M31::new(2);
    for (lane, shift) in diag[1..].iter_mut().zip(INTERNAL_DIAG_SHIFTS) {
        *lane = M31::new(1 << shift);
    }
    diag
}

/// Digest of every parameter that affects the permutation.
pub fn params_digest() -> Hash32 {
    let mut bytes = Vec::with_capacity(16 + 4 * (16 + STATE_WIDTH + TOTAL_ROUNDS * STATE_WIDTH));
    for n in [STATE_WIDTH, DIGEST_LIMBS, FULL_ROUNDS, PARTIAL_ROUNDS] {
        bytes.extend_from_slice(&(n as u32).to_le_bytes());
    }
    for entry in M4.iter().flatten() {
        bytes.extend_from_slice(&entry.to_le_bytes());
    }
    for d in internal_diag() {
        bytes.extend_from_slice(&d.to_le_bytes());
    }
    for c in round_constants().iter().flatten() {
        bytes.extend_from_slice(&c.to_le_bytes());
    }
    keccak_hash(&[b"zkdeposit/poseidon2-params", &bytes])
}

/// Whether round `round` applies the S-box to the whole state
#[inline]
pub fn is_full_round(round: usize) -> bool {
    let half_full = FULL_ROUNDS / 2;
    round < half_full || round >= half_full + PARTIAL_ROUNDS
}

/// S-box: x^5
#[inline]
pub fn sbox(x: M31) -> M31 {
    let x2 = x.square();
    let x4 = x2.square();
    x4 * x
}

/// External layer: `M4` on each block of four lanes, then every block gets
/// the lane-wise sum of all blocks added (`circ(2*M4, M4, M4, M4)`).
pub fn external_layer(state: &State) -> State {
    let mut mixed = [M31::ZERO; STATE_WIDTH];
    for (block, out) in state.chunks_exact(4).zip(mixed.chunks_exact_mut(4)) {
        for (row, o) in M4.iter().zip(out.iter_mut()) {
            *o = row
                .iter()
                .zip(block)
                .fold(M31::ZERO, |acc, (&m, &x)| acc + M31::new(m) * x);
        }
    }

    let mut sums = [M31::ZERO; 4];
    for block in mixed.chunks_exact(4) {
        for (sum, &x) in sums.iter_mut().zip(block) {
            *sum += x;
        }
    }
    for block in mixed.chunks_exact_mut(4) {
        for (x, &sum) in block.iter_mut().zip(sums.iter()) {
            *x += sum;
        }
    }
    mixed
}

/// Internal layer: `x_i' = sum(x) + V_i * x_i`
fn internal_layer(state: &State) -> State {
    let sum = state.iter().fold(M31::ZERO, |acc, &x| acc + x);
    let diag = internal_diag();
    let mut mixed = [M31::ZERO; STATE_WIDTH];
    for ((out, &x), &d) in mixed.iter_mut().zip(state).zip(diag.iter()) {
        *out = sum + d * x;
    }
    mixed
}

/// One round: add constants, S-box (all lanes or lane 0), linear layer.
pub fn round_function(state: &State, round: usize) -> State {
    let constants = &round_constants()[round];
    let mut next = *state;

    if is_full_round(round) {
        for (lane, c) in next.iter_mut().zip(constants) {
            *lane = sbox(*lane + *c);
        }
        external_layer(&next)
    } else {
        next[0] = sbox(next[0] + constants[0]);
        internal_layer(&next)
    }
}

/// Parent digest: the first [`DIGEST_LIMBS`] lanes of a permuted state
pub fn truncate(state: &State) -> Digest {
    let mut limbs = [M31::ZERO; DIGEST_LIMBS];
    limbs.copy_from_slice(&state[..DIGEST_LIMBS]);
    Digest::new(limbs)
}

/// Permutation input for a pair of children
pub fn pair_state(left: &Digest, right: &Digest) -> State {
    let mut state = [M31::ZERO; STATE_WIDTH];
    state[..DIGEST_LIMBS].copy_from_slice(left.limbs());
    state[DIGEST_LIMBS..].copy_from_slice(right.limbs());
    state
}

/// Poseidon2 permutation state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoseidonState {
    state: State,
}

impl PoseidonState {
    pub fn new() -> Self {
        Self {
            state: [M31::ZERO; STATE_WIDTH],
        }
    }

    pub fn from_state(state: State) -> Self {
        Self { state }
    }

    /// Run the full permutation
    pub fn permute(&mut self) {
        self.state = external_layer(&self.state);
        for round in 0..TOTAL_ROUNDS {
            self.state = round_function(&self.state, round);
        }
    }

    /// Run the permutation, recording the state after every round. The
    /// initial external mix is not recorded.
    pub fn permute_recording(&mut self) -> Vec<State> {
        self.state = external_layer(&self.state);
        (0..TOTAL_ROUNDS)
            .map(|round| {
                self.state = round_function(&self.state, round);
                self.state
            })
            .collect()
    }

    pub fn state(&self) -> State {
        self.state
    }
}

impl Default for PoseidonState {
    fn default() -> Self {
        Self::new()
    }
}

/// Compress two child digests into their parent
pub fn hash2(left: &Digest, right: &Digest) -> Digest {
    let mut state = PoseidonState::from_state(pair_state(left, right));
    state.permute();
    truncate(&state.state())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(seed: u32) -> Digest {
        Digest::new(std::array::from_fn(|i| M31::new(seed * 31 + i as u32)))
    }

    #[test]
    fn test_sbox() {
        assert_eq!(sbox(M31::new(2)).value(), 32);
        assert_eq!(sbox(M31::new(3)), M31::new(3).pow(5));
    }

    #[test]
    fn test_round_schedule() {
        let full = (0..TOTAL_ROUNDS).filter(|&r| is_full_round(r)).count();
        assert_eq!(full, FULL_ROUNDS);
        assert!(is_full_round(0));
        assert!(!is_full_round(4));
        assert!(is_full_round(TOTAL_ROUNDS - 1));
    }

    #[test]
    fn test_round_constants_are_distinct() {
        let constants = round_constants();
        assert_ne!(constants[0], constants[1]);
        assert!(constants.iter().flatten().all(|c| !c.is_zero()));
    }

    #[test]
    fn test_external_layer_on_unit_vector() {
        // lane 0 set: column 0 of M4 in block 0 doubled, copied to the other blocks
        let mut unit = [M31::ZERO; STATE_WIDTH];
        unit[0] = M31::ONE;
        let mixed = external_layer(&unit);
        let expected: Vec<u32> = [10, 8, 2, 2, 5, 4, 1, 1, 5, 4, 1, 1, 5, 4, 1, 1].to_vec();
        assert_eq!(mixed.iter().map(|x| x.value()).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_internal_layer_diagonal() {
        let mut unit = [M31::ZERO; STATE_WIDTH];
        unit[0] = M31::ONE;
        let mixed = internal_layer(&unit);
        // 1 + (-2) on the diagonal, 1 elsewhere
        assert_eq!(mixed[0], -M31::ONE);
        assert!(mixed[1..].iter().all(|x| *x == M31::ONE));
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash2(&digest(1), &digest(2)), hash2(&digest(1), &digest(2)));
    }

    #[test]
    fn test_hash_is_order_sensitive() {
        assert_ne!(hash2(&digest(1), &digest(2)), hash2(&digest(2), &digest(1)));
        let zero = Digest::default();
        assert_ne!(hash2(&zero, &zero), hash2(&zero, &Digest::from_leaf(M31::ONE)));
    }

    #[test]
    fn test_output_uses_every_limb() {
        let parent = hash2(&digest(5), &digest(6));
        assert!(parent.limbs().iter().all(|l| !l.is_zero()));

        let mut tweaked = *digest(6).limbs();
        tweaked[DIGEST_LIMBS - 1] += M31::ONE;
        let other = hash2(&digest(5), &Digest::new(tweaked));
        assert!(parent.limbs().iter().zip(other.limbs()).all(|(a, b)| a != b));
    }

    #[test]
    fn test_recording_matches_permute() {
        let input = pair_state(&digest(7), &digest(9));
        let mut plain = PoseidonState::from_state(input);
        plain.permute();

        let mut recorded = PoseidonState::from_state(input);
        let states = recorded.permute_recording();

        assert_eq!(states.len(), TOTAL_ROUNDS);
        assert_eq!(states[TOTAL_ROUNDS - 1], plain.state());
        assert_eq!(recorded, plain);
        assert_eq!(truncate(&plain.state()), hash2(&digest(7), &digest(9)));
    }

    #[test]
    fn test_params_digest_stable() {
        assert_eq!(params_digest(), params_digest());
    }
}
