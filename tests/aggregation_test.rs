//! Aggregation properties over a small road-use schema

use graphweave::element::{Edge, Element, Entity, PropertyValue};
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
            "weight",
            TypeDefinition::new("Integer").with_aggregate_function(BinaryOperator::Max),
        )
        .edge(
            "edge",
            SchemaElementDefinition::edge("string", "string").property("count", "count"),
        )
        .edge(
            "counted",
            SchemaElementDefinition::edge("string", "string")
                .property("count", "count")
                .property("weight", "weight")
                .group_by(["count"]),
        )
        .entity(
            "raw",
            SchemaElementDefinition::entity("string")
                .property("count", "count")
                .aggregate(false),
        )
        .build()
        .unwrap()
}

fn edge(group: &str, count: i64) -> Element {
    Edge::new(group, "A", "B", true)
        .with_property("count", count)
        .into()
}

#[test]
fn test_merge_sums_counts() {
    let result = ingest_aggregate(vec![edge("edge", 3), edge("edge", 5)], &schema()).unwrap();
    assert_eq!(result, vec![edge("edge", 8)]);
}

#[test]
fn test_reaggregation_is_idempotent() {
    let schema = schema();
    let once = ingest_aggregate(vec![edge("edge", 3), edge("edge", 5)], &schema).unwrap();
    let twice = ingest_aggregate(once.clone(), &schema).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_non_aggregated_groups_pass_through() {
    let raw: Element = Entity::new("raw", "A").with_property("count", 1i64).into();
    let result = ingest_aggregate(vec![raw.clone(), raw.clone()], &schema()).unwrap();
    assert_eq!(result, vec![raw.clone(), raw]);
}

#[test]
fn test_group_by_keeps_values_apart_at_ingest() {
    let first: Element = Edge::new("counted", "A", "B", true)
        .with_property("count", 3i64)
        .with_property("weight", 1i64)
        .into();
    let second: Element = Edge::new("counted", "A", "B", true)
        .with_property("count", 5i64)
        .with_property("weight", 9i64)
        .into();
    let result = ingest_aggregate(vec![first, second], &schema()).unwrap();
    assert_eq!(result.len(), 2);
}

#[test]
fn test_view_group_by_override_merges_everything() {
    let first: Element = Edge::new("counted", "A", "B", true)
        .with_property("count", 3i64)
        .with_property("weight", 1i64)
        .into();
    let second: Element = Edge::new("counted", "A", "B", true)
        .with_property("count", 5i64)
        .with_property("weight", 9i64)
        .into();
    let view = View::builder()
        .edge(
            "counted",
            ViewElementDefinition::builder()
                .group_by(Vec::<String>::new())
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let result = query_aggregate(vec![first, second], &schema(), &view, false).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].get_property("count"), Some(&PropertyValue::from(8i64)));
    assert_eq!(result[0].get_property("weight"), Some(&PropertyValue::from(9i64)));
}
