//! Benchmarks for the tree, witness recomputation and deposit proofs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use zkdeposit::{
    hash2, DepositProgram, Digest, MerkleTree, ProgramConfig, TransitionInput, M31, SET,
    TREE_HEIGHT,
};

fn bench_hash2(c: &mut Criterion) {
    let a = Digest::new(std::array::from_fn(|i| M31::new(12345 + i as u32)));
    let b = Digest::new(std::array::from_fn(|i| M31::new(67890 + i as u32)));

    c.bench_function("poseidon2_hash2", |bench| {
        bench.iter(|| hash2(black_box(&a), black_box(&b)))
    });
}

fn bench_tree(c: &mut Criterion) {
    let mut tree = MerkleTree::new(TREE_HEIGHT).unwrap();
    for index in 0..64 {
        tree.set_leaf(index, SET).unwrap();
    }

    c.bench_function("tree_set_leaf_h20", |bench| {
        let mut tree = tree.clone();
        bench.iter(|| tree.set_leaf(black_box(1000), SET))
    });
    c.bench_function("tree_get_witness_h20", |bench| {
        bench.iter(|| tree.get_witness(black_box(33)))
    });

    let witness = tree.get_witness(100).unwrap();
    c.bench_function("witness_calculate_root_h20", |bench| {
        bench.iter(|| witness.calculate_root(black_box(SET)))
    });
}

fn bench_deposit_proof(c: &mut Criterion) {
    let mut group = c.benchmark_group("deposit_proof");
    group.sample_size(10);

    for height in [8usize, TREE_HEIGHT] {
        let program = DepositProgram::compile(ProgramConfig::default().with_height(height)).unwrap();
        let witness = MerkleTree::new(height).unwrap().get_witness(0).unwrap();
        let input = TransitionInput::from_witness(&witness);
        let proof = program.create_deposit_proof(&input, &witness).unwrap();

        group.bench_with_input(BenchmarkId::new("prove", height), &height, |b, _| {
            b.iter(|| program.create_deposit_proof(black_box(&input), black_box(&witness)))
        });
        group.bench_with_input(BenchmarkId::new("verify", height), &height, |b, _| {
            b.iter(|| program.verify(black_box(&proof)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_hash2, bench_tree, bench_deposit_proof);
criterion_main!(benches);
