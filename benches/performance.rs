//! Performance benchmarks for the message relay.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use msgrelay::{MessageStore, RelayConfig};

fn store_with(max_messages: usize) -> MessageStore {
    MessageStore::new(&RelayConfig {
        max_messages,
        ..Default::default()
    })
}

/// Benchmark message append
fn bench_message_append(c: &mut Criterion) {
    let store = store_with(1024);

    c.bench_function("message_append", |b| {
        b.iter(|| {
            black_box(store.append("benchmark message").unwrap());
            // Keep the log bounded over long runs.
            if store.len() >= 100_000 {
                store.prune();
            }
        });
    });
}

/// Benchmark catch-up reads with varying backlog sizes
fn bench_list_since(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_since");

    for backlog in [100, 1_000, 10_000] {
        let store = store_with(backlog);
        for i in 0..backlog {
            store.append(format!("message {i}")).unwrap();
        }
        let newest = store.newest_id();

        group.bench_with_input(BenchmarkId::new("full", backlog), &store, |b, store| {
            b.iter(|| black_box(store.list_since(None)));
        });

        group.bench_with_input(BenchmarkId::new("caught_up", backlog), &store, |b, store| {
            b.iter(|| black_box(store.list_since(newest)));
        });
    }

    group.finish();
}

/// Benchmark pruning with varying overflow
fn bench_prune(c: &mut Criterion) {
    let mut group = c.benchmark_group("prune");

    for overflow in [100, 1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("overflow", overflow),
            &overflow,
            |b, &overflow| {
                b.iter_batched(
                    || {
                        let store = store_with(1024);
                        for i in 0..(1024 + overflow) {
                            store.append(format!("message {i}")).unwrap();
                        }
                        store
                    },
                    |store| {
                        black_box(store.prune());
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_message_append, bench_list_since, bench_prune);
criterion_main!(benches);
