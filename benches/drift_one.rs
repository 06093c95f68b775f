use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use quicksilver::drift_one;

/// Near-circular states with a small step: exercises the small-increment
/// fast path.
fn bench_fast_path(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xDEADBEEF);
    let samples = 10_000usize;

    c.bench_function("drift_one/near_circular_fast_path", |b| {
        b.iter_batched(
            || {
                (0..samples)
                    .map(|_| {
                        let r: f64 = rng.random_range(0.9..1.1);
                        let vt = (1.0 / r).sqrt() * rng.random_range(0.995..1.005);
                        (
                            Vector3::new(r, 0.0, 0.0),
                            Vector3::new(0.0, vt, 0.0),
                            rng.random_range(0.01..0.05),
                        )
                    })
                    .collect::<Vec<_>>()
            },
            |cases| {
                for (mut x, mut v, dt) in cases {
                    drift_one(1.0, black_box(&mut x), black_box(&mut v), black_box(dt)).unwrap();
                    black_box((x, v));
                }
            },
            BatchSize::LargeInput,
        )
    });
}

/// Eccentric elliptic states stepped far enough to force the
/// universal-variable solver.
fn bench_universal_elliptic(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xBADF00D);
    let samples = 10_000usize;

    c.bench_function("drift_one/universal_elliptic", |b| {
        b.iter_batched(
            || {
                (0..samples)
                    .map(|_| {
                        let r = rng.random_range(0.8..1.2);
                        let vt = rng.random_range(0.4..0.7);
                        (
                            Vector3::new(r, 0.0, 0.0),
                            Vector3::new(0.0, vt, 0.1),
                            rng.random_range(0.3..1.5),
                        )
                    })
                    .collect::<Vec<_>>()
            },
            |cases| {
                for (mut x, mut v, dt) in cases {
                    drift_one(1.0, black_box(&mut x), black_box(&mut v), black_box(dt)).unwrap();
                    black_box((x, v));
                }
            },
            BatchSize::LargeInput,
        )
    });
}

/// Hyperbolic flybys: the cubic initial guess plus the universal solver.
fn bench_hyperbolic(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xFEEDFACE);
    let samples = 10_000usize;

    c.bench_function("drift_one/hyperbolic", |b| {
        b.iter_batched(
            || {
                (0..samples)
                    .map(|_| {
                        let r = rng.random_range(5.0..15.0);
                        // vt^2 > 2/r for every draw, so alpha stays negative.
                        let vt = rng.random_range(0.65..0.9);
                        (
                            Vector3::new(r, 0.0, 0.0),
                            Vector3::new(0.0, vt, 0.0),
                            rng.random_range(5.0..30.0),
                        )
                    })
                    .collect::<Vec<_>>()
            },
            |cases| {
                for (mut x, mut v, dt) in cases {
                    drift_one(1.0, black_box(&mut x), black_box(&mut v), black_box(dt)).unwrap();
                    black_box((x, v));
                }
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_fast_path, bench_universal_elliptic, bench_hyperbolic
);
criterion_main!(benches);
