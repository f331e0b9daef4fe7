//! Performance benchmarks for the autoupdate service.

use autoupdate::{
    AllowAll, Autoupdate, ChangedData, Datastore, MemoryDatastore, NoAdditionalUpdates,
    RestrictionGate, Signal, StaticKeys, Topic, UserId,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::sync::Arc;

/// Benchmark publishing single-key events
fn bench_publish(c: &mut Criterion) {
    let topic = Topic::default();
    let mut i = 0u64;

    c.bench_function("topic_publish", |b| {
        b.iter(|| {
            i += 1;
            black_box(topic.publish([format!("key/{}", i % 1000)]));
        });
    });
}

/// Benchmark merging history with varying backlog sizes
fn bench_receive_backlog(c: &mut Criterion) {
    let mut group = c.benchmark_group("topic_receive_backlog");

    for backlog in [10u64, 100, 1000, 10_000] {
        group.bench_with_input(BenchmarkId::new("events", backlog), &backlog, |b, &backlog| {
            let topic = Topic::default();
            for i in 0..backlog {
                topic.publish([format!("key/{}", i % 500), "shared".to_string()]);
            }

            b.iter(|| {
                black_box(topic.receive(0, &Signal::never()).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark restricted fetches with varying key counts
fn bench_restricted_data(c: &mut Criterion) {
    let mut group = c.benchmark_group("restricted_data");

    for key_count in [10usize, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("keys", key_count),
            &key_count,
            |b, &key_count| {
                let ds = MemoryDatastore::with_data(
                    (0..key_count).map(|i| (format!("model/{}/field", i), json!(i))),
                );
                let gate = RestrictionGate::new(Arc::new(ds), Arc::new(AllowAll));
                let keys: Vec<String> = (0..key_count)
                    .map(|i| format!("model/{}/field", i))
                    .collect();

                b.iter(|| {
                    black_box(gate.restricted_data(UserId(1), &keys).unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark one write followed by one connection wake-up
fn bench_write_to_update(c: &mut Criterion) {
    let ds = Arc::new(MemoryDatastore::with_data([("counter", json!(0))]));
    let datastore: Arc<dyn Datastore> = ds.clone();
    let service = Autoupdate::new(
        datastore,
        Arc::new(AllowAll),
        Arc::new(NoAdditionalUpdates),
        Signal::never(),
    )
    .unwrap();
    let mut conn = service.connect(UserId(1), StaticKeys::new(["counter"]));
    conn.next(&Signal::never()).unwrap();

    let mut i = 0i64;
    c.bench_function("write_to_update", |b| {
        b.iter(|| {
            i += 1;
            let mut changes = ChangedData::new();
            changes.insert("counter".to_string(), Some(json!(i)));
            ds.send(changes).unwrap();
            black_box(conn.next(&Signal::never()).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_publish,
    bench_receive_backlog,
    bench_restricted_data,
    bench_write_to_update,
);
criterion_main!(benches);
