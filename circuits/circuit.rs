//! Deposit transition AIR
//!
//! One trace row per tree level, padded with zero rows to a power of two.
//! Each row carries two walks side by side: the walk that starts from an
//! `UNSET` leaf and the walk that starts from a `SET` leaf. Both share the
//! sibling and direction bit of that level.
//!
//! Row layout (every node is [`DIGEST_LIMBS`] columns wide):
//!
//! | column         | meaning                                     |
//! |----------------|---------------------------------------------|
//! | 0 .. 8         | sibling                                     |
//! | 8              | direction bit (1 = running node is right)   |
//! | walk + 0 .. 8  | running node entering this level            |
//! | walk + 8 .. 24 | ordered children fed to the permutation     |
//! | walk + 24 ..   | Poseidon2 state after each round            |
//!
//! with `walk = 9` for the `UNSET` walk and `walk = 9 + WALK_WIDTH` for the
//! `SET` walk. The output of a level is the first 8 lanes of the last round.

use itertools::Itertools;
use num_traits::{One, Zero};
use tracing::debug;
use zkdeposit_prover::air::{AirConfig, Constraint, ConstraintEvaluator, EvaluationFrame, Trace};
use zkdeposit_prover::M31;

use crate::digest::{Digest, DIGEST_LIMBS};
use crate::error::{CircuitError, CircuitResult};
use crate::merkle::{check_height, SET, UNSET};
use crate::poseidon::{
    external_layer, pair_state, round_function, truncate, PoseidonState, State, STATE_WIDTH,
    TOTAL_ROUNDS,
};
use crate::transition::TransitionInput;
use crate::witness::MerkleWitness;

pub const COL_SIBLING: usize = 0;
pub const COL_BIT: usize = DIGEST_LIMBS;

const WALK_NODE: usize = 0;
const WALK_LEFT: usize = DIGEST_LIMBS;
const WALK_RIGHT: usize = 2 * DIGEST_LIMBS;
const WALK_ROUNDS: usize = 3 * DIGEST_LIMBS;

/// Columns used by one walk
pub const WALK_WIDTH: usize = WALK_ROUNDS + TOTAL_ROUNDS * STATE_WIDTH;

const SHARED_WIDTH: usize = DIGEST_LIMBS + 1;

/// Total trace width
pub const NUM_COLUMNS: usize = SHARED_WIDTH + 2 * WALK_WIDTH;

/// Leaf value each walk starts from, in column order
const WALK_LEAVES: [M31; 2] = [UNSET, SET];

const fn walk_base(walk: usize) -> usize {
    SHARED_WIDTH + walk * WALK_WIDTH
}

const fn round_col(walk: usize, round: usize, lane: usize) -> usize {
    walk_base(walk) + WALK_ROUNDS + round * STATE_WIDTH + lane
}

const fn output_col(walk: usize, limb: usize) -> usize {
    round_col(walk, TOTAL_ROUNDS - 1, limb)
}

fn digest_at(row: &[M31], start: usize) -> [M31; DIGEST_LIMBS] {
    let mut limbs = [M31::zero(); DIGEST_LIMBS];
    limbs.copy_from_slice(&row[start..start + DIGEST_LIMBS]);
    limbs
}

/// Trace length for a tree height: one row per level, at least two rows.
pub fn trace_rows(height: usize) -> usize {
    height.next_power_of_two().max(2)
}

/// AIR proving that one witness turns `pre_root` into `pos_root`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositAir {
    height: usize,
    input: TransitionInput,
}

impl DepositAir {
    pub fn new(height: usize, input: TransitionInput) -> CircuitResult<Self> {
        check_height(height)?;
        Ok(Self { height, input })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn input(&self) -> &TransitionInput {
        &self.input
    }

    fn claimed_root(&self, walk: usize) -> &Digest {
        if walk == 0 {
            &self.input.pre_root
        } else {
            &self.input.pos_root
        }
    }

    /// Fill the trace from a witness. The result only satisfies the AIR if
    /// the witness reproduces both claimed roots.
    pub fn generate_trace(&self, witness: &MerkleWitness) -> CircuitResult<Trace> {
        if witness.height() != self.height {
            return Err(CircuitError::HeightMismatch {
                expected: self.height,
                found: witness.height(),
            });
        }

        let num_rows = trace_rows(self.height);
        let mut rows = Vec::with_capacity(num_rows);
        let mut nodes = WALK_LEAVES.map(Digest::from_leaf);

        for step in witness.steps() {
            let mut row = vec![M31::ZERO; NUM_COLUMNS];
            row[COL_SIBLING..COL_SIBLING + DIGEST_LIMBS].copy_from_slice(step.sibling.limbs());
            row[COL_BIT] = M31::from(!step.is_left);

            for (walk, node) in nodes.iter_mut().enumerate() {
                let base = walk_base(walk);
                let (left, right) = if step.is_left {
                    (*node, step.sibling)
                } else {
                    (step.sibling, *node)
                };
                row[base + WALK_NODE..base + WALK_LEFT].copy_from_slice(node.limbs());
                row[base + WALK_LEFT..base + WALK_RIGHT].copy_from_slice(left.limbs());
                row[base + WALK_RIGHT..base + WALK_ROUNDS].copy_from_slice(right.limbs());

                // same states hash2 passes through
                let recorded = PoseidonState::from_state(pair_state(&left, &right)).permute_recording();
                for (round, lanes) in recorded.iter().enumerate() {
                    let start = round_col(walk, round, 0);
                    row[start..start + STATE_WIDTH].copy_from_slice(lanes);
                }
                *node = truncate(&recorded[TOTAL_ROUNDS - 1]);
            }

            rows.push(row);
        }
        rows.resize(num_rows, vec![M31::ZERO; NUM_COLUMNS]);

        debug!(
            height = self.height,
            rows = num_rows,
            columns = NUM_COLUMNS,
            "deposit trace generated"
        );
        Ok(Trace::from_rows(&rows))
    }

    fn evaluate_walk(&self, frame: &EvaluationFrame, walk: usize, out: &mut Vec<M31>) {
        let cur = &frame.current;
        let base = walk_base(walk);
        let bit = cur[COL_BIT];
        let sibling = digest_at(cur, COL_SIBLING);
        let node = digest_at(cur, base + WALK_NODE);
        let left = digest_at(cur, base + WALK_LEFT);
        let right = digest_at(cur, base + WALK_RIGHT);

        // left = bit ? sibling : node, and {left, right} = {node, sibling}
        for limb in 0..DIGEST_LIMBS {
            out.push(left[limb] - (node[limb] + bit * (sibling[limb] - node[limb])));
        }
        for limb in 0..DIGEST_LIMBS {
            out.push(left[limb] + right[limb] - node[limb] - sibling[limb]);
        }

        let mut prev = external_layer(&pair_state(&Digest::new(left), &Digest::new(right)));
        for round in 0..TOTAL_ROUNDS {
            let expected = round_function(&prev, round);
            let mut actual: State = [M31::zero(); STATE_WIDTH];
            for lane in 0..STATE_WIDTH {
                actual[lane] = cur[round_col(walk, round, lane)];
                out.push(actual[lane] - expected[lane]);
            }
            prev = actual;
        }

        let output = digest_at(cur, output_col(walk, 0));
        let first = frame.row == 0;
        let last = frame.row + 1 == self.height;
        let leaf = Digest::from_leaf(WALK_LEAVES[walk]);
        let claimed = self.claimed_root(walk);

        for limb in 0..DIGEST_LIMBS {
            out.push(if first { node[limb] - leaf.limbs()[limb] } else { M31::zero() });
        }
        for limb in 0..DIGEST_LIMBS {
            out.push(if last {
                M31::zero()
            } else {
                frame.next[base + WALK_NODE + limb] - output[limb]
            });
        }
        for limb in 0..DIGEST_LIMBS {
            out.push(if last { output[limb] - claimed.limbs()[limb] } else { M31::zero() });
        }
    }
}

/// Constraints per walk: selection, sum, rounds, leaf, chain, root
const WALK_CONSTRAINTS: usize = 5 * DIGEST_LIMBS + TOTAL_ROUNDS * STATE_WIDTH;

impl ConstraintEvaluator for DepositAir {
    fn config(&self) -> AirConfig {
        AirConfig::new(
            trace_rows(self.height).trailing_zeros(),
            NUM_COLUMNS,
            2 * DIGEST_LIMBS,
        )
    }

    fn evaluate(&self, frame: &EvaluationFrame) -> Vec<M31> {
        let num_constraints = 1 + 2 * WALK_CONSTRAINTS;
        if frame.row >= self.height {
            // padding
            return vec![M31::zero(); num_constraints];
        }

        let mut out = Vec::with_capacity(num_constraints);
        let bit = frame.current[COL_BIT];
        out.push(bit * (M31::one() - bit));
        for walk in 0..WALK_LEAVES.len() {
            self.evaluate_walk(frame, walk, &mut out);
        }
        out
    }

    fn constraints(&self) -> Vec<Constraint> {
        let mut constraints = vec![Constraint::new("bit_boolean", 2, vec![COL_BIT])];

        for walk in 0..WALK_LEAVES.len() {
            let base = walk_base(walk);
            let name = |what: &str, i: usize| format!("walk{}_{}{}", walk, what, i);

            constraints.extend((0..DIGEST_LIMBS).map(|limb| {
                Constraint::new(
                    name("select_left", limb),
                    2,
                    vec![
                        COL_SIBLING + limb,
                        COL_BIT,
                        base + WALK_NODE + limb,
                        base + WALK_LEFT + limb,
                    ],
                )
            }));
            constraints.extend((0..DIGEST_LIMBS).map(|limb| {
                Constraint::new(
                    name("children_sum", limb),
                    1,
                    vec![
                        COL_SIBLING + limb,
                        base + WALK_NODE + limb,
                        base + WALK_LEFT + limb,
                        base + WALK_RIGHT + limb,
                    ],
                )
            }));
            constraints.extend((0..TOTAL_ROUNDS).cartesian_product(0..STATE_WIDTH).map(
                |(round, lane)| {
                    let mut columns: Vec<usize> = if round == 0 {
                        (base + WALK_LEFT..base + WALK_ROUNDS).collect()
                    } else {
                        (0..STATE_WIDTH).map(|l| round_col(walk, round - 1, l)).collect()
                    };
                    columns.push(round_col(walk, round, lane));
                    Constraint::new(format!("walk{}_round{}_lane{}", walk, round, lane), 5, columns)
                },
            ));
            constraints.extend((0..DIGEST_LIMBS).map(|limb| {
                Constraint::new(name("leaf", limb), 1, vec![base + WALK_NODE + limb])
            }));
            constraints.extend((0..DIGEST_LIMBS).map(|limb| {
                Constraint::new(
                    name("chain", limb),
                    1,
                    vec![base + WALK_NODE + limb, output_col(walk, limb)],
                )
            }));
            constraints.extend((0..DIGEST_LIMBS).map(|limb| {
                Constraint::new(name("root", limb), 1, vec![output_col(walk, limb)])
            }));
        }

        constraints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::MerkleTree;
    use zkdeposit_prover::air::verify_constraints;

    fn honest(height: usize, index: u64) -> (DepositAir, MerkleWitness) {
        let tree = MerkleTree::new(height).unwrap();
        let witness = tree.get_witness(index).unwrap();
        let air = DepositAir::new(height, TransitionInput::from_witness(&witness)).unwrap();
        (air, witness)
    }

    #[test]
    fn test_layout() {
        assert_eq!(WALK_WIDTH, 24 + 22 * 16);
        assert_eq!(NUM_COLUMNS, 9 + 2 * 376);
        assert_eq!(output_col(1, 0), NUM_COLUMNS - STATE_WIDTH);
        assert_eq!(trace_rows(20), 32);
        assert_eq!(trace_rows(1), 2);
    }

    #[test]
    fn test_constraint_count_matches_evaluation() {
        let (air, witness) = honest(3, 5);
        let trace = air.generate_trace(&witness).unwrap();
        for row in 0..trace.num_rows {
            assert_eq!(air.evaluate(&trace.frame(row)).len(), air.constraints().len());
        }
        assert_eq!(air.constraints().len(), 1 + 2 * WALK_CONSTRAINTS);
        assert_eq!(air.max_degree(), 5);
    }

    #[test]
    fn test_honest_trace_satisfies() {
        for (height, index) in [(1, 1), (3, 5), (5, 0), (5, 31)] {
            let (air, witness) = honest(height, index);
            let trace = air.generate_trace(&witness).unwrap();
            assert_eq!(trace.num_rows, trace_rows(height));
            assert!(verify_constraints(&air, &trace).is_ok(), "height {height} index {index}");
        }
    }

    #[test]
    fn test_last_row_outputs_are_roots() {
        let (air, witness) = honest(4, 9);
        let trace = air.generate_trace(&witness).unwrap();
        let row = trace.row(3);
        assert_eq!(Digest::new(digest_at(&row, output_col(0, 0))), air.input().pre_root);
        assert_eq!(Digest::new(digest_at(&row, output_col(1, 0))), air.input().pos_root);
    }

    #[test]
    fn test_forged_root_fails_constraints() {
        let (honest_air, witness) = honest(4, 9);
        let mut limbs = *honest_air.input().pos_root.limbs();
        limbs[5] += M31::one();
        let forged = TransitionInput::new(honest_air.input().pre_root, Digest::new(limbs));
        let air = DepositAir::new(4, forged).unwrap();
        let trace = air.generate_trace(&witness).unwrap();

        let failures = verify_constraints(&air, &trace).unwrap_err();
        assert_eq!(failures, vec![(3, "walk1_root5".to_string())]);
    }

    #[test]
    fn test_flipped_bit_fails_constraints() {
        let (air, witness) = honest(3, 2);
        let trace = air.generate_trace(&witness).unwrap();
        let mut rows = trace.rows();
        rows[1][COL_BIT] = M31::one() - rows[1][COL_BIT];

        let tampered = Trace::from_rows(&rows);
        assert!(verify_constraints(&air, &tampered).is_err());
    }

    #[test]
    fn test_single_limb_of_sibling_is_bound() {
        let (air, witness) = honest(3, 6);
        let trace = air.generate_trace(&witness).unwrap();
        let mut rows = trace.rows();
        rows[2][COL_SIBLING + 7] += M31::one();

        let failures = verify_constraints(&air, &Trace::from_rows(&rows)).unwrap_err();
        assert!(failures.iter().all(|(row, _)| *row == 2));
        assert!(failures.iter().any(|(_, name)| name == "walk0_children_sum7"));
    }

    #[test]
    fn test_padding_rows_are_unconstrained() {
        let (air, witness) = honest(5, 3);
        let trace = air.generate_trace(&witness).unwrap();
        let mut rows = trace.rows();
        rows[7][0] = M31::new(424242);
        assert!(verify_constraints(&air, &Trace::from_rows(&rows)).is_ok());
    }

    #[test]
    fn test_height_mismatch() {
        let (air, _) = honest(4, 0);
        let other = MerkleTree::new(3).unwrap().get_witness(0).unwrap();
        assert!(matches!(
            air.generate_trace(&other),
            Err(CircuitError::HeightMismatch { expected: 4, found: 3 })
        ));
    }
}
