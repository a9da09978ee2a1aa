use criterion::{Criterion, criterion_group, criterion_main};
use policy_rag::index::{FlatIndex, VectorIndex};
use std::hint::black_box;

const DIMENSION: usize = 3072;
const ROWS: usize = 2_000;

fn pseudo_random_vector(seed: usize) -> Vec<f32> {
    (0..DIMENSION)
        .map(|i| ((seed * 31 + i * 17) % 997) as f32 / 997.0)
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let vectors: Vec<Vec<f32>> = (0..ROWS).map(pseudo_random_vector).collect();
    let mut index = FlatIndex::new(DIMENSION);
    index.add(&vectors).expect("vectors share the index dimension");
    let query = pseudo_random_vector(ROWS + 1);

    c.bench_function("flat_search_top5", |b| {
        b.iter(|| index.search(black_box(&query), black_box(5)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
