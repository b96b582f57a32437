//! Benchmarks for trace commitment and the prove/verify pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use zkdeposit_prover::air::{AirConfig, Constraint, ConstraintEvaluator, EvaluationFrame, Trace, TraceColumn};
use zkdeposit_prover::merkle::{hash_row, MerkleCommitment};
use zkdeposit_prover::prelude::*;

fn trace_rows(num_rows: u32, width: u32) -> Vec<Vec<M31>> {
    (0..num_rows)
        .map(|r| (0..width).map(|c| M31::new(r * width + c)).collect())
        .collect()
}

fn bench_hash_row(c: &mut Criterion) {
    let row: Vec<M31> = (0..390).map(M31::new).collect();

    c.bench_function("hash_row_390", |bench| bench.iter(|| hash_row(black_box(&row))));
}

fn bench_commit_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_rows");

    for num_rows in [32u32, 256, 1024] {
        let rows = trace_rows(num_rows, 64);
        group.bench_with_input(BenchmarkId::new("rows", num_rows), &rows, |b, rows| {
            b.iter(|| MerkleCommitment::commit_rows(black_box(rows.clone())))
        });
    }

    group.finish();
}

fn bench_open(c: &mut Criterion) {
    let commitment = MerkleCommitment::commit_rows(trace_rows(1024, 64));

    c.bench_function("commitment_open", |bench| {
        bench.iter(|| commitment.open(black_box(512)))
    });
}

/// Running sum: x[i+1] = x[i] + i on every row but the last.
struct AccumulatorAir {
    log_rows: u32,
}

impl ConstraintEvaluator for AccumulatorAir {
    fn config(&self) -> AirConfig {
        AirConfig::new(self.log_rows, 1, 0)
    }

    fn evaluate(&self, frame: &EvaluationFrame) -> Vec<M31> {
        if frame.row + 1 == frame.num_rows {
            return vec![M31::ZERO];
        }
        vec![frame.next[0] - frame.current[0] - M31::new(frame.row as u32)]
    }

    fn constraints(&self) -> Vec<Constraint> {
        vec![Constraint::new("accumulate", 1, vec![0])]
    }
}

fn bench_prove_verify(c: &mut Criterion) {
    let air = AccumulatorAir { log_rows: 10 };
    let mut values = vec![M31::ZERO];
    for i in 1..1024u32 {
        values.push(values[i as usize - 1] + M31::new(i - 1));
    }
    let trace = Trace::new(vec![TraceColumn::new(0, values)]);

    let prover = Prover::with_defaults();
    let verifier = Verifier::with_defaults();
    let proof = prover.prove(&air, &trace, PublicInputs::default()).unwrap();

    c.bench_function("prove_1024_rows", |bench| {
        bench.iter(|| prover.prove(&air, black_box(&trace), PublicInputs::default()))
    });
    c.bench_function("verify_1024_rows", |bench| {
        bench.iter(|| verifier.verify(&air, black_box(&proof)))
    });
}

criterion_group!(
    benches,
    bench_hash_row,
    bench_commit_rows,
    bench_open,
    bench_prove_verify,
);

criterion_main!(benches);
