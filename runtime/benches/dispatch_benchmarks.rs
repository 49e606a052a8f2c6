//! Dispatch pipeline benchmarks
//!
//! Measures the engine overhead around a settled request: status commits,
//! merge propagation, and change broadcasting, over an in-process transport
//! that resolves immediately.
//!
//! Run with: `cargo bench`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used)] // Benchmarks can use expect for setup

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use refetch_core::{FetchFactory, Method, Namespace, RequestSpec};
use refetch_runtime::Dispatcher;
use refetch_testing::MockTransport;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Benchmark Fixtures
// ============================================================================

const RECORD_LIST: Namespace = Namespace::new("recordList");
const RECORD: Namespace = Namespace::new("record");

fn merge_record(current: Option<&Value>, incoming: &Value) -> Option<Value> {
    let list = current?.as_array()?;
    let id = incoming.get("id")?;
    let index = list.iter().position(|record| record.get("id") == Some(id))?;
    let mut next = list.clone();
    *next.get_mut(index)? = incoming.clone();
    Some(Value::Array(next))
}

fn list_factory() -> FetchFactory {
    FetchFactory::new("Record List", RECORD_LIST, |_, _| RequestSpec::get("/records"))
        .with_merge(RECORD, merge_record)
}

fn record_factory() -> FetchFactory {
    FetchFactory::new("Get Record", RECORD, |key, _| {
        RequestSpec::get(format!("/records/{key}"))
    })
}

fn backend() -> MockTransport {
    MockTransport::new()
        .route(Method::Get, "/records", |_| {
            Ok(json!([{ "id": "a", "rev": 1 }, { "id": "b", "rev": 1 }]))
        })
        .route(Method::Get, "/records/:id", |req| {
            Ok(json!({ "id": req.param("id"), "rev": 2 }))
        })
}

/// Dispatcher over the mock backend with `lists` list entries pre-cached, so
/// every record commit fans out to that many merge targets.
async fn dispatcher_with_cached_lists(lists: usize) -> Dispatcher {
    let dispatcher = Dispatcher::builder(Arc::new(backend()))
        .with_factory(&list_factory())
        .with_factory(&record_factory())
        .build();
    for n in 0..lists {
        dispatcher
            .dispatch(&list_factory().make(n.to_string()))
            .await
            .expect("list seed dispatch failed");
    }
    dispatcher
}

// ============================================================================
// Benchmarks
// ============================================================================

/// Per-dispatch engine overhead against an immediate transport.
fn bench_dispatch_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_overhead");
    group.measurement_time(Duration::from_secs(10));

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let dispatcher = Dispatcher::builder(Arc::new(backend()))
        .with_factory(&record_factory())
        .build();
    let fetch = record_factory().make("a");

    group.bench_function("dispatch_single_fetch", |b| {
        b.to_async(&runtime).iter(|| async {
            dispatcher.dispatch(black_box(&fetch)).await.ok();
        });
    });

    group.bench_function("dispatch_100_sequential", |b| {
        b.to_async(&runtime).iter(|| async {
            for _ in 0..100 {
                dispatcher.dispatch(black_box(&fetch)).await.ok();
            }
        });
    });

    group.finish();
}

/// Merge fan-out cost: one record commit rewriting every cached list.
fn bench_merge_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_fanout");
    group.measurement_time(Duration::from_secs(10));

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");

    for lists in [4_usize, 16] {
        let dispatcher = runtime.block_on(dispatcher_with_cached_lists(lists));
        let fetch = record_factory().make("a");

        group.bench_function(format!("merge_into_{lists}_cached_lists"), |b| {
            b.to_async(&runtime).iter(|| async {
                dispatcher.dispatch(black_box(&fetch)).await.ok();
            });
        });
    }

    group.finish();
}

/// Broadcast cost with idle watchers attached to the store.
fn bench_watch_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("watch_overhead");
    group.measurement_time(Duration::from_secs(10));

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let dispatcher = Dispatcher::builder(Arc::new(backend()))
        .with_factory(&record_factory())
        .build();
    let fetch = record_factory().make("a");
    let _watchers: Vec<_> = (0..8).map(|_| dispatcher.store().watch(&fetch)).collect();

    group.bench_function("dispatch_with_8_watchers", |b| {
        b.to_async(&runtime).iter(|| async {
            dispatcher.dispatch(black_box(&fetch)).await.ok();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_dispatch_overhead,
    bench_merge_fanout,
    bench_watch_overhead
);
criterion_main!(benches);
