//! AIR (Algebraic Intermediate Representation) constraints
//!
//! A circuit is a trace of fixed width and power-of-two height plus a set of
//! transition constraints. Each constraint is evaluated on an
//! [`EvaluationFrame`]: one row, its successor (wrapping), and the row's
//! position. Constraints that only apply on some rows gate themselves on
//! `frame.row`, which the verifier knows independently of the prover.

use crate::m31::M31;

/// Shape of an AIR
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AirConfig {
    /// Log2 of the trace length
    pub log_trace_length: u32,
    /// Number of columns in the trace
    pub num_columns: usize,
    /// Number of public inputs
    pub num_public_inputs: usize,
}

impl AirConfig {
    pub fn new(log_trace_length: u32, num_columns: usize, num_public_inputs: usize) -> Self {
        Self {
            log_trace_length,
            num_columns,
            num_public_inputs,
        }
    }

    /// Trace length
    pub fn trace_length(&self) -> usize {
        1 << self.log_trace_length
    }
}

/// A column in the execution trace
#[derive(Clone, Debug)]
pub struct TraceColumn {
    /// Column index
    pub index: usize,
    /// Column values
    pub values: Vec<M31>,
}

impl TraceColumn {
    pub fn new(index: usize, values: Vec<M31>) -> Self {
        Self { index, values }
    }

    /// Get value at row i
    pub fn at(&self, row: usize) -> M31 {
        self.values[row % self.values.len()]
    }
}

/// Execution trace (multiple columns)
#[derive(Clone, Debug)]
pub struct Trace {
    /// Columns of the trace
    pub columns: Vec<TraceColumn>,
    /// Number of rows
    pub num_rows: usize,
}

impl Trace {
    pub fn new(columns: Vec<TraceColumn>) -> Self {
        let num_rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        Self { columns, num_rows }
    }

    /// Create trace from a 2D array (row-major)
    pub fn from_rows(rows: &[Vec<M31>]) -> Self {
        let num_cols = rows.first().map(Vec::len).unwrap_or(0);

        let columns = (0..num_cols)
            .map(|col_idx| {
                let values: Vec<M31> = rows.iter().map(|row| row[col_idx]).collect();
                TraceColumn::new(col_idx, values)
            })
            .collect();

        Self {
            columns,
            num_rows: rows.len(),
        }
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Get a specific cell
    pub fn get(&self, row: usize, col: usize) -> M31 {
        self.columns[col].at(row)
    }

    /// Materialize one row (wrapping)
    pub fn row(&self, row: usize) -> Vec<M31> {
        self.columns.iter().map(|c| c.at(row)).collect()
    }

    /// All rows, row-major
    pub fn rows(&self) -> Vec<Vec<M31>> {
        (0..self.num_rows).map(|r| self.row(r)).collect()
    }

    /// Frame for evaluating constraints at `row`
    pub fn frame(&self, row: usize) -> EvaluationFrame {
        EvaluationFrame {
            row,
            num_rows: self.num_rows,
            current: self.row(row),
            next: self.row(row + 1),
        }
    }

    /// Get log2 of trace length (for power-of-two traces)
    pub fn log_length(&self) -> u32 {
        self.num_rows.trailing_zeros()
    }
}

/// The cells a transition constraint can see
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluationFrame {
    /// Index of `current` in the trace
    pub row: usize,
    /// Trace length
    pub num_rows: usize,
    /// Values of row `row`
    pub current: Vec<M31>,
    /// Values of row `row + 1 mod num_rows`
    pub next: Vec<M31>,
}

impl EvaluationFrame {
    pub fn new(row: usize, num_rows: usize, current: Vec<M31>, next: Vec<M31>) -> Self {
        Self {
            row,
            num_rows,
            current,
            next,
        }
    }
}

/// A polynomial constraint
#[derive(Clone, Debug)]
pub struct Constraint {
    /// Constraint name (for debugging)
    pub name: String,
    /// Degree of the constraint polynomial
    pub degree: usize,
    /// Columns involved in this constraint
    pub columns: Vec<usize>,
}

impl Constraint {
    pub fn new(name: impl Into<String>, degree: usize, columns: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            degree,
            columns,
        }
    }
}

/// Constraint evaluator trait
///
/// `evaluate` must return one value per entry of `constraints()`, in the same
/// order. A satisfied trace evaluates to zero everywhere.
pub trait ConstraintEvaluator {
    /// Shape of the trace this AIR accepts
    fn config(&self) -> AirConfig;

    /// Evaluate all constraints on a frame
    fn evaluate(&self, frame: &EvaluationFrame) -> Vec<M31>;

    /// Get constraint definitions
    fn constraints(&self) -> Vec<Constraint>;

    /// Maximum constraint degree
    fn max_degree(&self) -> usize {
        self.constraints().iter().map(|c| c.degree).max().unwrap_or(0)
    }
}

/// Name of the `i`-th constraint, falling back to its position
pub(crate) fn constraint_name(constraints: &[Constraint], i: usize) -> String {
    constraints
        .get(i)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| format!("constraint_{}", i))
}

/// Verify that all constraints evaluate to zero on every row
pub fn verify_constraints<E: ConstraintEvaluator + ?Sized>(
    evaluator: &E,
    trace: &Trace,
) -> Result<(), Vec<(usize, String)>> {
    let mut failures = Vec::new();
    let constraints = evaluator.constraints();

    for row in 0..trace.num_rows {
        let evals = evaluator.evaluate(&trace.frame(row));

        for (i, eval) in evals.iter().enumerate() {
            if !eval.is_zero() {
                failures.push((row, constraint_name(&constraints, i)));
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// x[i+1] = x[i] + 1 on every row but the last
    struct CounterAir {
        log_rows: u32,
    }

    impl ConstraintEvaluator for CounterAir {
        fn config(&self) -> AirConfig {
            AirConfig::new(self.log_rows, 1, 0)
        }

        fn evaluate(&self, frame: &EvaluationFrame) -> Vec<M31> {
            if frame.row + 1 == frame.num_rows {
                return vec![M31::ZERO];
            }
            vec![frame.next[0] - frame.current[0] - M31::ONE]
        }

        fn constraints(&self) -> Vec<Constraint> {
            vec![Constraint::new("increment", 1, vec![0])]
        }
    }

    fn counter_trace(n: u32) -> Trace {
        Trace::new(vec![TraceColumn::new(0, (0..n).map(M31::new).collect())])
    }

    #[test]
    fn test_trace_creation() {
        let rows = vec![
            vec![M31::new(1), M31::new(2)],
            vec![M31::new(3), M31::new(4)],
            vec![M31::new(5), M31::new(6)],
        ];

        let trace = Trace::from_rows(&rows);

        assert_eq!(trace.num_rows, 3);
        assert_eq!(trace.num_columns(), 2);
        assert_eq!(trace.get(0, 0).value(), 1);
        assert_eq!(trace.get(1, 1).value(), 4);
        assert_eq!(trace.rows(), rows);
    }

    #[test]
    fn test_frame_wraps() {
        let trace = counter_trace(4);
        let frame = trace.frame(3);
        assert_eq!(frame.current, vec![M31::new(3)]);
        assert_eq!(frame.next, vec![M31::new(0)]);
        assert_eq!(trace.log_length(), 2);
    }

    #[test]
    fn test_verify_constraints() {
        let air = CounterAir { log_rows: 3 };
        assert!(verify_constraints(&air, &counter_trace(8)).is_ok());
    }

    #[test]
    fn test_constraint_violation_reports_row() {
        let air = CounterAir { log_rows: 2 };
        let trace = Trace::new(vec![TraceColumn::new(
            0,
            vec![M31::new(0), M31::new(1), M31::new(5), M31::new(6)],
        )]);

        let failures = verify_constraints(&air, &trace).unwrap_err();
        assert_eq!(failures, vec![(1, "increment".to_string())]);
    }

    #[test]
    fn test_constraint_max_degree() {
        let air = CounterAir { log_rows: 2 };
        assert_eq!(air.max_degree(), 1);
    }
}
