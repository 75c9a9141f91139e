//! Aggregation engine
//!
//! Groups a materialised collection of elements by a key derived from the
//! schema (ingest) or the view (query) and folds each key-group with the
//! group's aggregator. The first element seen for a key becomes the
//! accumulator and later elements are merged into it. Elements of groups
//! that are not aggregated pass through untouched.
//!
//! Ownership of the input elements moves into the engine; the returned
//! elements are the surviving accumulators followed by the pass-through
//! elements, each in encounter order.

use crate::element::{Element, IdentifierType, Properties};
use crate::function::{ElementAggregator, FunctionError};
use crate::schema::{Schema, SchemaError};
use crate::view::{View, ViewError};
use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxBuildHasher, FxHashMap};
use thiserror::Error;
use tracing::debug;

/// Aggregation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    /// Element group absent from the schema
    #[error("Received group {0} which was not found in the schema")]
    GroupNotFound(String),

    #[error("Schema error: {0}")]
    Schema(SchemaError),

    #[error("View error: {0}")]
    View(ViewError),

    /// A binary operator failed while merging
    #[error("Aggregation of group '{group}' failed: {source}")]
    Function {
        group: String,
        #[source]
        source: FunctionError,
    },
}

impl From<SchemaError> for AggregationError {
    fn from(error: SchemaError) -> Self {
        match error {
            SchemaError::GroupNotFound(group) => AggregationError::GroupNotFound(group),
            other => AggregationError::Schema(other),
        }
    }
}

impl From<ViewError> for AggregationError {
    fn from(error: ViewError) -> Self {
        match error {
            ViewError::Schema(schema) => schema.into(),
            other => AggregationError::View(other),
        }
    }
}

pub type AggregationResult<T> = Result<T, AggregationError>;

/// Predicate selecting elements whose group is aggregated
#[derive(Debug, Clone, PartialEq)]
pub struct IsElementAggregated {
    aggregated_groups: IndexSet<String>,
}

impl IsElementAggregated {
    pub fn from_schema(schema: &Schema) -> Self {
        IsElementAggregated {
            aggregated_groups: schema.aggregated_groups(),
        }
    }

    pub fn from_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IsElementAggregated {
            aggregated_groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    /// `None` never counts as aggregated
    pub fn test(&self, element: Option<&Element>) -> bool {
        element.map_or(false, |e| self.aggregated_groups.contains(e.group()))
    }
}

/// Grouping columns and aggregator resolved for one group
struct GroupPlan {
    group_by: Vec<String>,
    aggregator: ElementAggregator,
}

fn ingest_plan(schema: &Schema, group: &str) -> AggregationResult<GroupPlan> {
    Ok(GroupPlan {
        group_by: schema.ingest_group_by(group)?,
        aggregator: schema.ingest_aggregator(group)?,
    })
}

fn query_plan(schema: &Schema, view: &View, group: &str) -> AggregationResult<GroupPlan> {
    let group_by = view.query_group_by(group, schema)?;
    let def = view.get_element(group);
    let aggregator = schema.query_aggregator(group, &group_by, def.aggregator.as_ref())?;
    Ok(GroupPlan {
        group_by,
        aggregator,
    })
}

/// Key element: group and identifiers plus the grouping properties, and the
/// matched vertex for edges when requested.
fn key_element(element: &Element, group_by: &[String], include_matched_vertex: bool) -> Element {
    let mut key = element.empty_clone();
    for property in group_by {
        if let Some(value) = element.get_property(property) {
            key.put_property(property.clone(), value.clone());
        }
    }
    if include_matched_vertex {
        if let Element::Edge(edge) = element {
            key.put_property(
                IdentifierType::MatchedVertex.as_str(),
                edge.matched_vertex_value().clone(),
            );
        }
    }
    key
}

fn aggregate_elements<I, E, P>(
    elements: I,
    schema: &Schema,
    include_matched_vertex: bool,
    mut plan_for: P,
) -> AggregationResult<Vec<Element>>
where
    I: IntoIterator<Item = E>,
    E: Into<Option<Element>>,
    P: FnMut(&str) -> AggregationResult<GroupPlan>,
{
    let aggregated_groups = schema.aggregated_groups();
    let mut plans: FxHashMap<String, GroupPlan> = FxHashMap::default();
    let mut reduced: IndexMap<Element, Element, FxBuildHasher> = IndexMap::default();
    let mut pass_through = Vec::new();

    for element in elements.into_iter().filter_map(Into::into) {
        let group = element.group();
        if !schema.has_group(group) {
            return Err(AggregationError::GroupNotFound(group.to_string()));
        }
        if !aggregated_groups.contains(group) {
            pass_through.push(element);
            continue;
        }
        if !plans.contains_key(group) {
            plans.insert(group.to_string(), plan_for(group)?);
        }
        let plan = match plans.get(group) {
            Some(plan) => plan,
            None => return Err(AggregationError::GroupNotFound(group.to_string())),
        };

        let key = key_element(&element, &plan.group_by, include_matched_vertex);
        match reduced.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(element);
            }
            Entry::Occupied(mut slot) => {
                plan.aggregator
                    .apply_in_place(slot.get_mut(), &element)
                    .map_err(|source| AggregationError::Function {
                        group: element.group().to_string(),
                        source,
                    })?;
            }
        }
    }

    debug!(
        groups = reduced.len(),
        passed_through = pass_through.len(),
        "aggregated elements"
    );
    let mut output: Vec<Element> = reduced.into_values().collect();
    output.extend(pass_through);
    Ok(output)
}

/// Merge elements sharing a group and ingest groupBy values
pub fn ingest_aggregate<I, E>(elements: I, schema: &Schema) -> AggregationResult<Vec<Element>>
where
    I: IntoIterator<Item = E>,
    E: Into<Option<Element>>,
{
    aggregate_elements(elements, schema, false, |group| ingest_plan(schema, group))
}

/// Merge elements sharing a group and query groupBy values.
///
/// With `include_matched_vertex`, edges that matched the seed on different
/// endpoints are kept apart. Entities ignore the flag.
pub fn query_aggregate<I, E>(
    elements: I,
    schema: &Schema,
    view: &View,
    include_matched_vertex: bool,
) -> AggregationResult<Vec<Element>>
where
    I: IntoIterator<Item = E>,
    E: Into<Option<Element>>,
{
    aggregate_elements(elements, schema, include_matched_vertex, |group| {
        query_plan(schema, view, group)
    })
}

/// Property bag tagged with its group
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupedProperties {
    pub group: String,
    pub properties: Properties,
}

impl GroupedProperties {
    pub fn new(group: impl Into<String>, properties: Properties) -> Self {
        GroupedProperties {
            group: group.into(),
            properties,
        }
    }
}

fn aggregate_properties<I, P>(
    items: I,
    schema: &Schema,
    mut plan_for: P,
) -> AggregationResult<Vec<GroupedProperties>>
where
    I: IntoIterator<Item = GroupedProperties>,
    P: FnMut(&str) -> AggregationResult<GroupPlan>,
{
    let aggregated_groups = schema.aggregated_groups();
    let mut plans: FxHashMap<String, GroupPlan> = FxHashMap::default();
    let mut reduced: IndexMap<GroupedProperties, GroupedProperties, FxBuildHasher> =
        IndexMap::default();
    let mut pass_through = Vec::new();

    for item in items {
        if !schema.has_group(&item.group) {
            return Err(AggregationError::GroupNotFound(item.group));
        }
        if !aggregated_groups.contains(&item.group) {
            pass_through.push(item);
            continue;
        }
        if !plans.contains_key(&item.group) {
            plans.insert(item.group.clone(), plan_for(&item.group)?);
        }
        let plan = match plans.get(&item.group) {
            Some(plan) => plan,
            None => return Err(AggregationError::GroupNotFound(item.group)),
        };

        let key = GroupedProperties {
            group: item.group.clone(),
            properties: plan
                .group_by
                .iter()
                .filter_map(|p| item.properties.get(p).map(|v| (p.clone(), v.clone())))
                .collect(),
        };
        match reduced.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(item);
            }
            Entry::Occupied(mut slot) => {
                plan.aggregator
                    .apply_in_place(&mut slot.get_mut().properties, &item.properties)
                    .map_err(|source| AggregationError::Function {
                        group: item.group.clone(),
                        source,
                    })?;
            }
        }
    }

    let mut output: Vec<GroupedProperties> = reduced.into_values().collect();
    output.extend(pass_through);
    Ok(output)
}

/// Properties-level counterpart of [`ingest_aggregate`]
pub fn ingest_properties_aggregate<I>(
    items: I,
    schema: &Schema,
) -> AggregationResult<Vec<GroupedProperties>>
where
    I: IntoIterator<Item = GroupedProperties>,
{
    aggregate_properties(items, schema, |group| ingest_plan(schema, group))
}

/// Properties-level counterpart of [`query_aggregate`]
pub fn query_properties_aggregate<I>(
    items: I,
    schema: &Schema,
    view: &View,
) -> AggregationResult<Vec<GroupedProperties>>
where
    I: IntoIterator<Item = GroupedProperties>,
{
    aggregate_properties(items, schema, |group| query_plan(schema, view, group))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Edge, Entity, MatchedVertex, PropertyValue};
    use crate::function::BinaryOperator;
    use crate::schema::{SchemaElementDefinition, TypeDefinition};
    use crate::view::ViewElementDefinition;

    fn schema() -> Schema {
        Schema::builder()
            .type_def("string", TypeDefinition::new("String"))
            .type_def(
                "count",
                TypeDefinition::new("Integer").with_aggregate_function(BinaryOperator::Sum),
            )
            .edge(
                "edge",
                SchemaElementDefinition::edge("string", "string").property("count", "count"),
            )
            .edge(
                "daily",
                SchemaElementDefinition::edge("string", "string")
                    .property("count", "count")
                    .property("day", "count")
                    .group_by(["day"]),
            )
            .entity(
                "plain",
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
    fn test_ingest_merges_same_key() {
        let result = ingest_aggregate(vec![edge("edge", 3), edge("edge", 5)], &schema()).unwrap();
        assert_eq!(result, vec![edge("edge", 8)]);
    }

    #[test]
    fn test_ingest_keeps_distinct_identifiers_apart() {
        let other: Element = Edge::new("edge", "A", "C", true)
            .with_property("count", 1i64)
            .into();
        let result =
            ingest_aggregate(vec![edge("edge", 3), other.clone(), edge("edge", 5)], &schema())
                .unwrap();
        assert_eq!(result, vec![edge("edge", 8), other]);
    }

    #[test]
    fn test_group_by_values_separate_groups() {
        let mut monday = edge("daily", 1);
        monday.put_property("day", 1i64);
        let mut tuesday = edge("daily", 2);
        tuesday.put_property("day", 2i64);
        let mut monday_again = edge("daily", 4);
        monday_again.put_property("day", 1i64);

        let result = ingest_aggregate(vec![monday, tuesday.clone(), monday_again], &schema()).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].get_property("count"), Some(&PropertyValue::from(5i64)));
        assert_eq!(result[1], tuesday);
    }

    #[test]
    fn test_pass_through_and_nulls_dropped() {
        let plain: Element = Entity::new("plain", "v").with_property("count", 1i64).into();
        let input: Vec<Option<Element>> = vec![Some(plain.clone()), None, Some(plain.clone())];
        let result = ingest_aggregate(input, &schema()).unwrap();
        assert_eq!(result, vec![plain.clone(), plain]);
    }

    #[test]
    fn test_unknown_group_is_an_error() {
        let result = ingest_aggregate(vec![edge("missing", 1)], &schema());
        let error = result.unwrap_err();
        assert_eq!(error, AggregationError::GroupNotFound("missing".into()));
        assert_eq!(
            error.to_string(),
            "Received group missing which was not found in the schema"
        );
    }

    #[test]
    fn test_query_view_group_by_override() {
        let schema = schema();
        let view = View::builder()
            .edge(
                "daily",
                ViewElementDefinition::builder()
                    .group_by(Vec::<String>::new())
                    .aggregator(
                        ElementAggregator::builder()
                            .select(["day"])
                            .execute(BinaryOperator::Max)
                            .build(),
                    )
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        let mut first = edge("daily", 1);
        first.put_property("day", 1i64);
        let mut second = edge("daily", 2);
        second.put_property("day", 7i64);

        let result = query_aggregate(vec![first, second], &schema, &view, false).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].get_property("day"), Some(&PropertyValue::from(7i64)));
        assert_eq!(result[0].get_property("count"), Some(&PropertyValue::from(3i64)));
    }

    #[test]
    fn test_query_include_matched_vertex() {
        let schema = schema();
        let view = View::default();
        let from_a: Element = Edge::new("edge", "A", "B", true)
            .with_property("count", 1i64)
            .with_matched_vertex(MatchedVertex::Source)
            .into();
        let from_b: Element = Edge::new("edge", "A", "B", true)
            .with_property("count", 1i64)
            .with_matched_vertex(MatchedVertex::Destination)
            .into();

        let kept_apart =
            query_aggregate(vec![from_a.clone(), from_b.clone()], &schema, &view, true).unwrap();
        assert_eq!(kept_apart.len(), 2);

        let merged = query_aggregate(vec![from_a, from_b], &schema, &view, false).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].get_property("count"), Some(&PropertyValue::from(2i64)));
    }

    #[test]
    fn test_is_element_aggregated() {
        let predicate = IsElementAggregated::from_schema(&schema());
        assert!(predicate.test(Some(&edge("edge", 1))));
        assert!(!predicate.test(Some(&Entity::new("plain", "v").into())));
        assert!(!predicate.test(None));

        let predicate = IsElementAggregated::from_groups(["plain"]);
        assert!(predicate.test(Some(&Entity::new("plain", "v").into())));
    }

    #[test]
    fn test_properties_aggregate() {
        let item = |count: i64| {
            GroupedProperties::new("edge", vec![("count", count)].into_iter().collect())
        };
        let result = ingest_properties_aggregate(vec![item(2), item(3)], &schema()).unwrap();
        assert_eq!(result, vec![item(5)]);

        let result =
            query_properties_aggregate(vec![item(2), item(3)], &schema(), &View::default()).unwrap();
        assert_eq!(result, vec![item(5)]);
    }
}
