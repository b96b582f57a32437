//! Benchmarks for M31 field operations

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use zkdeposit_prover::m31::{M31, M31_PRIME};

fn bench_mul(c: &mut Criterion) {
    let a = M31::new(12345);
    let b = M31::new(67890);

    c.bench_function("m31_mul", |bench| bench.iter(|| black_box(a) * black_box(b)));
}

fn bench_sbox(c: &mut Criterion) {
    let a = M31::new(12345);

    // x^5, the S-box degree used by the circuits
    c.bench_function("m31_pow5", |bench| bench.iter(|| black_box(a).pow(5)));
}

fn bench_inverse(c: &mut Criterion) {
    let a = M31::new(12345);

    c.bench_function("m31_inv", |bench| bench.iter(|| black_box(a).inv()));
}

fn bench_reduction(c: &mut Criterion) {
    let large: u64 = (M31_PRIME as u64) * 1234 + 5678;

    c.bench_function("m31_reduce", |bench| bench.iter(|| M31::reduce(black_box(large))));
}

fn bench_dot_product(c: &mut Criterion) {
    let mut group = c.benchmark_group("m31_dot");

    for size in [3usize, 64, 1024] {
        let a: Vec<M31> = (0..size as u32).map(M31::new).collect();
        let b: Vec<M31> = (0..size as u32).map(|i| M31::new(i * 2 + 1)).collect();

        group.bench_with_input(BenchmarkId::new("len", size), &size, |bench, _| {
            bench.iter(|| {
                black_box(&a)
                    .iter()
                    .zip(black_box(&b))
                    .map(|(&x, &y)| x * y)
                    .sum::<M31>()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_mul,
    bench_sbox,
    bench_inverse,
    bench_reduction,
    bench_dot_product,
);

criterion_main!(benches);
