//! Benchmarks for filter compilation and cursor paging
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use fleetql::collection::{CollectionEngine, Cursor};
use fleetql::model::Record;
use fleetql::query::{compile, OrderSpec};
use fleetql::resources::ResourceKind;

const NOW: i64 = 1_705_329_342_123;

fn create_devices(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            Record::new()
                .with("id", format!("00000000-00000000-00000000-{:08X}", i))
                .with("name", format!("device-{:05}", i))
                .with("type", if i % 3 == 0 { "EX50" } else { "TX64" })
                .with("connection_status", if i % 2 == 0 { "connected" } else { "disconnected" })
                .with("signal_percent", (i % 100) as f64)
        })
        .collect()
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let schema = ResourceKind::Devices.schema();

    for (name, query) in [
        ("single_clause", "type='EX50'"),
        ("three_clauses", "connection_status='connected' and signal_percent>50 and name contains 'gate'"),
        ("relative_time", "last_connect>-1d and type startswith 'EX'"),
    ] {
        group.bench_function(name, |b| b.iter(|| compile(schema, black_box(query)).unwrap()));
    }

    group.finish();
}

fn bench_paging(c: &mut Criterion) {
    let mut group = c.benchmark_group("paging");
    let schema = ResourceKind::Devices.schema();
    let engine = CollectionEngine::default();
    let predicate = compile(schema, "connection_status='connected' and signal_percent>20")
        .unwrap()
        .bind(NOW);
    let order = OrderSpec::compile(schema, Some("signal_percent desc, name asc")).unwrap();

    for size in [1_000, 10_000, 100_000] {
        let records = create_devices(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("first_page_{}", size), |b| {
            b.iter(|| {
                engine
                    .page(black_box(records.clone()), &predicate, &order, "id", 100, None)
                    .unwrap()
            })
        });

        let first = engine
            .page(records.clone(), &predicate, &order, "id", 100, None)
            .unwrap();
        let token = first.cursor.unwrap();

        group.bench_function(format!("resume_page_{}", size), |b| {
            b.iter(|| {
                let cursor = Cursor::decode(black_box(&token)).unwrap();
                engine
                    .page(records.clone(), &predicate, &order, "id", 100, Some(&cursor))
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_paging);
criterion_main!(benches);
