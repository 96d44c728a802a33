// Placement search benchmarks
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use shelfx_core::{Algorithm, Product, ProductList, SimilarityTable};

fn generate_catalog(count: usize, seed: u64) -> (ProductList, SimilarityTable) {
    let mut rng = StdRng::seed_from_u64(seed);
    let names: Vec<String> = (0..count).map(|i| format!("product-{:03}", i)).collect();
    let mut similarity = SimilarityTable::new();
    for i in 0..count {
        for j in (i + 1)..count {
            if rng.random_bool(0.4) {
                similarity
                    .set(&names[i], &names[j], rng.random_range(0.0..=1.0))
                    .unwrap();
            }
        }
    }
    let products = names.into_iter().map(Product::new).collect();
    (ProductList::new("bench", products).unwrap(), similarity)
}

fn benchmark_exhaustive(c: &mut Criterion) {
    let mut group = c.benchmark_group("exhaustive");
    group.sample_size(20);

    for (count, xsize, ysize) in [(4, 2, 2), (6, 3, 2), (8, 3, 3)] {
        let (products, similarity) = generate_catalog(count, 7);
        group.bench_with_input(
            BenchmarkId::new("unbounded", format!("{}on{}x{}", count, xsize, ysize)),
            &count,
            |b, _| {
                b.iter(|| {
                    Algorithm::Exhaustive
                        .solve(black_box(&products), xsize, ysize, -1, &similarity, None)
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn benchmark_hill_climbing(c: &mut Criterion) {
    let mut group = c.benchmark_group("hill_climbing");

    for (count, side) in [(12, 4), (36, 6), (96, 10)] {
        let (products, similarity) = generate_catalog(count, 11);
        for limit in [1_000i64, -1] {
            group.bench_with_input(
                BenchmarkId::new(format!("limit{}", limit), format!("{}on{}x{}", count, side, side)),
                &limit,
                |b, &limit| {
                    b.iter(|| {
                        Algorithm::HillClimbing
                            .solve(black_box(&products), side, side, limit, &similarity, None)
                            .unwrap()
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_exhaustive, benchmark_hill_climbing);
criterion_main!(benches);
