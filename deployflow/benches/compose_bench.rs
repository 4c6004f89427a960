//! Benchmarks for flow composition and ordering.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use deployflow::context::{ClusterSnapshot, ServerGroup};
use deployflow::strategy::{FlowComposer, Strategy};
use deployflow::testing::fixtures;

fn cluster_of(size: usize) -> ClusterSnapshot {
    let groups = (0..size)
        .map(|i| {
            let group = ServerGroup::new(
                format!("app-main-v{:03}", i + 1),
                fixtures::base_time() + chrono::Duration::hours(i64::try_from(i).unwrap_or(0)),
            );
            if i + 1 == size {
                group
            } else {
                group.disabled()
            }
        })
        .collect();
    ClusterSnapshot::new(groups)
}

fn compose_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose_flow");
    for size in [1usize, 10, 100] {
        let snapshot = cluster_of(size);
        let ctx = fixtures::stage_context().with_max_remaining_group_count(2);
        for strategy in [Strategy::RedBlack, Strategy::Highlander] {
            group.bench_with_input(
                BenchmarkId::new(strategy.key(), size),
                &snapshot,
                |b, snapshot| b.iter(|| strategy.compose_flow(black_box(&ctx), black_box(snapshot))),
            );
        }
    }
    group.finish();
}

fn ordering_benchmark(c: &mut Criterion) {
    let flow = Strategy::Highlander
        .compose_flow(&fixtures::stage_context(), &cluster_of(100))
        .unwrap();
    c.bench_function("execution_order/highlander_100", |b| {
        b.iter(|| black_box(&flow).execution_order().len())
    });
    c.bench_function("fingerprint/highlander_100", |b| {
        b.iter(|| black_box(&flow).fingerprint())
    });
}

criterion_group!(benches, compose_benchmark, ordering_benchmark);
criterion_main!(benches);
