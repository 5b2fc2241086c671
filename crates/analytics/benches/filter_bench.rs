//! Filter compile and evaluation benchmarks
//!
//! Run with: `cargo bench -p blogstat-analytics --bench filter_bench`

use std::hint::black_box;
use std::sync::Arc;

use blogstat_analytics::{
    Blog, CompareType, Country, MemoryStore, MetricsEngine, User, ViewEvent, compile,
};
use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};
use tokio::runtime::Runtime;

fn build_store(views: i64) -> MemoryStore {
    let store = MemoryStore::new();
    let countries = ["US", "DE", "JP", "BR"];
    for code in countries {
        store
            .insert_country(Country::new(code, format!("country-{}", code)))
            .unwrap();
    }
    for u in 0..50 {
        store.insert_user(User::new(format!("user{}", u))).unwrap();
    }
    for b in 0..200 {
        store
            .insert_blog(Blog::new(b, format!("blog {}", b), format!("user{}", b % 50)))
            .unwrap();
    }

    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    for id in 0..views {
        let mut view = ViewEvent::new(id, id % 200, start + Duration::minutes(id * 7))
            .with_viewer(format!("user{}", id % 50));
        if id % 5 != 0 {
            view = view.with_country(countries[(id % 4) as usize]);
        }
        store.insert_view(view).unwrap();
    }
    store
}

fn nested_filter() -> Value {
    json!({
        "and": [
            {"field": "viewed_at", "gte": "2023-02-01"},
            {"or": [
                {"field": "viewer_country", "in": ["US", "DE"]},
                {"field": "blog__title", "contains": "blog 1"}
            ]},
            {"not": [{"field": "viewer_user", "eq": "user7"}]}
        ]
    })
}

fn bench_compile(c: &mut Criterion) {
    let doc = nested_filter();
    c.bench_function("compile_nested_filter", |b| {
        b.iter(|| compile(Some(black_box(&doc))).unwrap())
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_ids");
    let predicate = compile(Some(&nested_filter())).unwrap();

    for views in [1_000i64, 10_000, 100_000] {
        let store = build_store(views);
        group.throughput(Throughput::Elements(views as u64));
        group.bench_with_input(BenchmarkId::new("views", views), &store, |b, store| {
            b.iter(|| store.filter_ids(black_box(&predicate)).unwrap())
        });
    }

    group.finish();
}

fn bench_growth(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let engine = MetricsEngine::new(Arc::new(build_store(50_000)));
    let doc = nested_filter();

    c.bench_function("growth_by_week_50k", |b| {
        b.to_async(&rt).iter(|| async {
            engine
                .performance_get_time_series(CompareType::Week, None, Some(&doc))
                .await
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_compile, bench_evaluate, bench_growth);
criterion_main!(benches);
