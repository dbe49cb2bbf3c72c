use criterion::{Criterion, black_box, criterion_group, criterion_main};
use hybridtree::{HybridTree, Point, QueryEngine, Recorder, Rect, TreeConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn uniform_points(n: usize) -> Vec<Point<3>> {
    let mut rng = StdRng::seed_from_u64(1);
    (0..n)
        .map(|_| {
            Point::new([
                rng.random_range(0.0f32..1.0),
                rng.random_range(0.0f32..1.0),
                rng.random_range(0.0f32..1.0),
            ])
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let points = uniform_points(100_000);
    let config = TreeConfig::default();

    c.bench_function("build_100k_points", |b| {
        b.iter(|| {
            let mut recorder = Recorder::new();
            let tree =
                HybridTree::build(black_box(&points), config.clone(), &mut recorder).unwrap();
            black_box(tree)
        });
    });
}

fn bench_search(c: &mut Criterion) {
    let points = uniform_points(100_000);
    let config = TreeConfig::default();
    let mut recorder = Recorder::new();
    let tree = HybridTree::build(&points, config, &mut recorder).unwrap();
    let engine = QueryEngine::new(&tree);

    let side = 0.01f32.cbrt();
    let queries: Vec<Rect<3>> = (0..64)
        .map(|i| {
            let base = (i as f32 / 64.0) * (1.0 - side);
            Rect::new(
                Point::new([base, base, base]),
                Point::new([base + side, base + side, base + side]),
            )
        })
        .collect();

    c.bench_function("search_batch_64_queries", |b| {
        b.iter(|| {
            let mut recorder = Recorder::new();
            black_box(engine.search_batch(black_box(&queries), &mut recorder))
        });
    });
}

criterion_group!(benches, bench_build, bench_search);
criterion_main!(benches);
