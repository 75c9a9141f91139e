use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use graphweave::element::{Edge, Element};
use graphweave::function::BinaryOperator;
use graphweave::schema::{Schema, SchemaElementDefinition, TypeDefinition};
use graphweave::view::{View, ViewElementDefinition};
use graphweave::{ingest_aggregate, query_aggregate};

fn schema() -> Schema {
    Schema::builder()
        .type_def("string", TypeDefinition::new("String"))
        .type_def(
            "count",
            TypeDefinition::new("Integer").with_aggregate_function(BinaryOperator::Sum),
        )
        .type_def(
            "day",
            TypeDefinition::new("Integer").with_aggregate_function(BinaryOperator::Max),
        )
        .edge(
            "road",
            SchemaElementDefinition::edge("string", "string")
                .property("count", "count")
                .property("day", "day")
                .group_by(["day"]),
        )
        .build()
        .expect("benchmark schema")
}

/// `size` edges over 100 distinct endpoint pairs and 7 days
fn edges(size: usize) -> Vec<Element> {
    (0..size)
        .map(|i| {
            Edge::new("road", format!("J{}", i % 10), format!("J{}", (i / 10) % 10), true)
                .with_property("count", 1i64)
                .with_property("day", (i % 7) as i64)
                .into()
        })
        .collect()
}

/// Benchmark ingest aggregation throughput
fn bench_ingest_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest_aggregate");
    let schema = schema();

    for size in [100, 1000, 10_000].iter() {
        let input = edges(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| ingest_aggregate(input.clone(), &schema).expect("aggregate"));
        });
    }
    group.finish();
}

/// Benchmark query aggregation with a view collapsing the day grouping
fn bench_query_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_aggregate");
    let schema = schema();
    let view = View::builder()
        .edge(
            "road",
            ViewElementDefinition::builder()
                .group_by(Vec::<String>::new())
                .build()
                .expect("view definition"),
        )
        .build()
        .expect("view");

    for size in [100, 1000, 10_000].iter() {
        let input = edges(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| query_aggregate(input.clone(), &schema, &view, false).expect("aggregate"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ingest_aggregate, bench_query_aggregate);
criterion_main!(benches);
