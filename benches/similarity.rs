use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use local_rag::rag::{rank_top_k, SimilarityIndex, VectorMatrix};

const DIMENSION: usize = 768;

fn random_rows(rng: &mut StdRng, rows: usize) -> Vec<Vec<f32>> {
    (0..rows)
        .map(|_| (0..DIMENSION).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

fn bench_search(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let mut group = c.benchmark_group("cosine_top_k");

    for rows in [500usize, 3000] {
        let data = random_rows(&mut rng, rows);
        let matrix = VectorMatrix::from_rows(data.iter().map(Vec::as_slice), DIMENSION).unwrap();
        let index = SimilarityIndex::new(matrix);
        let query: Vec<f32> = (0..DIMENSION).map(|_| rng.gen_range(-1.0..1.0)).collect();

        group.bench_with_input(BenchmarkId::new("search_k5", rows), &rows, |b, _| {
            b.iter(|| index.search(black_box(&query), 5).unwrap())
        });
    }
    group.finish();
}

fn bench_rank(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let scores: Vec<f32> = (0..3000).map(|_| rng.gen_range(-1.0..1.0)).collect();

    c.bench_function("rank_top_k_3000", |b| {
        b.iter(|| rank_top_k(black_box(&scores), 5).unwrap())
    });
}

criterion_group!(benches, bench_search, bench_rank);
criterion_main!(benches);
