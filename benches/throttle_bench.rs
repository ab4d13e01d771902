//! Benchmarks for the throttled mapping engine.
//!
//! Benchmarks cover:
//! - Throttled async mapping at several concurrency caps
//! - Unlimited-mode mapping (gate bypassed)
//! - The blocking runner on worker threads

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::convert::Infallible;
use std::hint::black_box;

use tokio::runtime::Runtime;

use prometheus_throttle::core::{run_limited, run_limited_blocking, Concurrency};

const ITEMS: u64 = 256;

fn bench_async_map(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");

    let mut group = c.benchmark_group("async_map");
    group.throughput(Throughput::Elements(ITEMS));

    for limit in [4usize, 16, 64] {
        group.bench_with_input(BenchmarkId::new("limited", limit), &limit, |b, &limit| {
            b.to_async(&rt).iter(|| async move {
                let out = run_limited(
                    (0..ITEMS).collect::<Vec<_>>(),
                    |n, _index| async move { Ok::<_, Infallible>(n.wrapping_mul(31)) },
                    limit,
                )
                .await
                .expect("bench run");
                black_box(out)
            });
        });
    }

    group.bench_function("unlimited", |b| {
        b.to_async(&rt).iter(|| async {
            let out = run_limited(
                (0..ITEMS).collect::<Vec<_>>(),
                |n, _index| async move { Ok::<_, Infallible>(n.wrapping_mul(31)) },
                Concurrency::Unlimited,
            )
            .await
            .expect("bench run");
            black_box(out)
        });
    });

    group.finish();
}

fn bench_blocking_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("blocking_map");
    group.throughput(Throughput::Elements(64));

    group.bench_function("limited_8", |b| {
        b.iter(|| {
            let out = run_limited_blocking(
                (0..64u64).collect::<Vec<_>>(),
                |n, _index| Ok::<_, Infallible>(n.wrapping_mul(31)),
                8,
            )
            .expect("bench run");
            black_box(out)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_async_map, bench_blocking_map);
criterion_main!(benches);
