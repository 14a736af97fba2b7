//! Benchmarks for program generation, traversal, and evaluation.

#![allow(missing_docs)] // Benchmark macros generate undocumented functions

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use treegp::gp::{
    evaluate, traverse, ConstantPool, GrowConfig, Mode, Program, MAX_DEPTH, MAX_PROGRAM_LEN,
};

fn bench_generate(c: &mut Criterion) {
    let grow = GrowConfig::default();
    let mut rng = SmallRng::seed_from_u64(1);

    c.bench_function("generate_program", |b| {
        b.iter(|| black_box(Program::random(&mut rng, MAX_DEPTH, MAX_PROGRAM_LEN - 1, &grow)));
    });
}

fn bench_traverse(c: &mut Criterion) {
    let grow = GrowConfig::default();
    let mut rng = SmallRng::seed_from_u64(2);
    let programs: Vec<Program> = (0..64)
        .map(|_| Program::random(&mut rng, MAX_DEPTH, MAX_PROGRAM_LEN - 1, &grow))
        .collect();

    c.bench_function("traverse_whole_program", |b| {
        b.iter(|| {
            for program in &programs {
                let _ = black_box(traverse(program.tokens(), Mode::FromPoint, 0));
            }
        });
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let grow = GrowConfig::default();
    let mut rng = SmallRng::seed_from_u64(3);
    let constants = ConstantPool::random(&mut rng);
    let programs: Vec<Program> = (0..64)
        .map(|_| Program::random(&mut rng, MAX_DEPTH, MAX_PROGRAM_LEN - 1, &grow))
        .collect();

    c.bench_function("evaluate_population_case", |b| {
        b.iter(|| {
            for program in &programs {
                let _ = black_box(evaluate(program.tokens(), 0.5, -0.5, &constants));
            }
        });
    });
}

criterion_group!(benches, bench_generate, bench_traverse, bench_evaluate);
criterion_main!(benches);
