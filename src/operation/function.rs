//! Filter, Transform and Aggregate over an element stream
//!
//! Functions are keyed by group, separately for entities and edges, with an
//! optional global function applied to every element of the matching kind.

use super::payload::{Payload, PayloadType};
use super::{ElementInput, Operation, OperationResult, Options};
use crate::aggregation::query_aggregate;
use crate::element::Element;
use crate::function::{ElementAggregator, ElementFilter, ElementTransformer};
use crate::schema::Schema;
use crate::view::{View, ViewElementDefinition};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Keep elements passing the filters of their group
///
/// Elements of a group with no filter of their own are dropped unless a
/// global filter covers their kind. A Filter with no filters at all keeps
/// everything.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub input: ElementInput,
    pub entities: IndexMap<String, ElementFilter>,
    pub edges: IndexMap<String, ElementFilter>,
    pub global_elements: Option<ElementFilter>,
    pub global_entities: Option<ElementFilter>,
    pub global_edges: Option<ElementFilter>,
    pub options: Options,
}

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    pub fn entity(mut self, group: impl Into<String>, filter: ElementFilter) -> Self {
        self.entities.insert(group.into(), filter);
        self
    }

    pub fn edge(mut self, group: impl Into<String>, filter: ElementFilter) -> Self {
        self.edges.insert(group.into(), filter);
        self
    }

    pub fn global_elements(mut self, filter: ElementFilter) -> Self {
        self.global_elements = Some(filter);
        self
    }

    pub fn global_entities(mut self, filter: ElementFilter) -> Self {
        self.global_entities = Some(filter);
        self
    }

    pub fn global_edges(mut self, filter: ElementFilter) -> Self {
        self.global_edges = Some(filter);
        self
    }

    fn is_empty(&self) -> bool {
        self.entities.is_empty()
            && self.edges.is_empty()
            && self.global_elements.is_none()
            && self.global_entities.is_none()
            && self.global_edges.is_none()
    }

    /// Whether `element` survives this filter
    pub fn test(&self, element: &Element) -> OperationResult<bool> {
        if self.is_empty() {
            return Ok(true);
        }
        let (by_group, global_kind) = if element.is_entity() {
            (&self.entities, &self.global_entities)
        } else {
            (&self.edges, &self.global_edges)
        };
        let filters: Vec<&ElementFilter> = [
            self.global_elements.as_ref(),
            global_kind.as_ref(),
            by_group.get(element.group()),
        ]
        .into_iter()
        .flatten()
        .collect();

        if filters.is_empty() {
            return Ok(false);
        }
        for filter in filters {
            if !filter.test(element)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Operation for Filter {
    fn class(&self) -> &'static str {
        "Filter"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn input_type(&self) -> PayloadType {
        PayloadType::Elements
    }

    fn output_type(&self) -> PayloadType {
        PayloadType::Elements
    }

    fn set_input(&mut self, input: Payload) -> OperationResult<()> {
        match input {
            Payload::Elements(stream) => {
                self.input = ElementInput::new(stream);
                Ok(())
            }
            other => Err(self.invalid_input(&other)),
        }
    }

    fn shallow_clone(&self) -> Box<dyn Operation> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Apply per-group transformers; elements of other groups pass unchanged
#[derive(Debug, Clone, Default)]
pub struct Transform {
    pub input: ElementInput,
    pub entities: IndexMap<String, ElementTransformer>,
    pub edges: IndexMap<String, ElementTransformer>,
    pub global_elements: Option<ElementTransformer>,
    pub options: Options,
}

impl Transform {
    pub fn new() -> Self {
        Transform::default()
    }

    pub fn entity(mut self, group: impl Into<String>, transformer: ElementTransformer) -> Self {
        self.entities.insert(group.into(), transformer);
        self
    }

    pub fn edge(mut self, group: impl Into<String>, transformer: ElementTransformer) -> Self {
        self.edges.insert(group.into(), transformer);
        self
    }

    pub fn global_elements(mut self, transformer: ElementTransformer) -> Self {
        self.global_elements = Some(transformer);
        self
    }

    /// Global transformer first, then the group's own
    pub fn apply(&self, element: &mut Element) -> OperationResult<()> {
        if let Some(global) = &self.global_elements {
            global.apply(element)?;
        }
        let by_group = if element.is_entity() {
            &self.entities
        } else {
            &self.edges
        };
        if let Some(transformer) = by_group.get(element.group()) {
            transformer.apply(element)?;
        }
        Ok(())
    }
}

impl Operation for Transform {
    fn class(&self) -> &'static str {
        "Transform"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn input_type(&self) -> PayloadType {
        PayloadType::Elements
    }

    fn output_type(&self) -> PayloadType {
        PayloadType::Elements
    }

    fn set_input(&mut self, input: Payload) -> OperationResult<()> {
        match input {
            Payload::Elements(stream) => {
                self.input = ElementInput::new(stream);
                Ok(())
            }
            other => Err(self.invalid_input(&other)),
        }
    }

    fn shallow_clone(&self) -> Box<dyn Operation> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Grouping override and aggregator for one group of an [`Aggregate`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatePair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_aggregator: Option<ElementAggregator>,
}

impl AggregatePair {
    pub fn new() -> Self {
        AggregatePair::default()
    }

    pub fn with_group_by<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_aggregator(mut self, aggregator: ElementAggregator) -> Self {
        self.element_aggregator = Some(aggregator);
        self
    }
}

/// Query-time aggregation of the input using the store schema
///
/// Groups listed here use their own grouping and aggregator; with no groups
/// listed every schema group is aggregated with its defaults. Elements of
/// unlisted groups pass through.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    pub input: ElementInput,
    pub entities: IndexMap<String, AggregatePair>,
    pub edges: IndexMap<String, AggregatePair>,
    pub options: Options,
}

impl Aggregate {
    pub fn new() -> Self {
        Aggregate::default()
    }

    pub fn entity(mut self, group: impl Into<String>, pair: AggregatePair) -> Self {
        self.entities.insert(group.into(), pair);
        self
    }

    pub fn edge(mut self, group: impl Into<String>, pair: AggregatePair) -> Self {
        self.edges.insert(group.into(), pair);
        self
    }

    fn as_view(&self) -> OperationResult<View> {
        let definition = |pair: &AggregatePair| ViewElementDefinition {
            group_by: pair.group_by.clone(),
            aggregator: pair.element_aggregator.clone(),
            ..Default::default()
        };
        let mut builder = View::builder();
        for (group, pair) in &self.entities {
            builder = builder.entity(group.clone(), definition(pair));
        }
        for (group, pair) in &self.edges {
            builder = builder.edge(group.clone(), definition(pair));
        }
        Ok(builder.build()?)
    }

    /// Aggregate `elements` against `schema`
    pub fn apply(&self, elements: Vec<Element>, schema: &Schema) -> OperationResult<Vec<Element>> {
        let view = self.as_view()?;
        if view.is_unrestricted() {
            return Ok(query_aggregate(elements, schema, &view, false)?);
        }
        let (listed, unlisted): (Vec<Element>, Vec<Element>) = elements
            .into_iter()
            .partition(|e| view.includes_group(e.group()));
        let mut output = query_aggregate(listed, schema, &view, false)?;
        output.extend(unlisted);
        Ok(output)
    }
}

impl Operation for Aggregate {
    fn class(&self) -> &'static str {
        "Aggregate"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn input_type(&self) -> PayloadType {
        PayloadType::Elements
    }

    fn output_type(&self) -> PayloadType {
        PayloadType::Elements
    }

    fn set_input(&mut self, input: Payload) -> OperationResult<()> {
        match input {
            Payload::Elements(stream) => {
                self.input = ElementInput::new(stream);
                Ok(())
            }
            other => Err(self.invalid_input(&other)),
        }
    }

    fn shallow_clone(&self) -> Box<dyn Operation> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Edge, Entity, PropertyValue};
    use crate::function::{BinaryOperator, Function, Predicate};
    use crate::schema::{SchemaElementDefinition, TypeDefinition};

    fn edge(count: i64) -> Element {
        Edge::new("edge", "A", "B", true)
            .with_property("count", count)
            .into()
    }

    #[test]
    fn test_filter_by_group() {
        let filter = Filter::new().edge(
            "edge",
            ElementFilter::builder()
                .select(["count"])
                .execute(Predicate::is_more_than(5i64))
                .build(),
        );
        assert!(filter.test(&edge(10)).unwrap());
        assert!(!filter.test(&edge(3)).unwrap());
        // no filter applies to entities
        assert!(!filter.test(&Entity::new("entity", "A").into()).unwrap());
        assert!(Filter::new().test(&edge(3)).unwrap());
    }

    #[test]
    fn test_global_entity_filter() {
        let filter = Filter::new().global_entities(
            ElementFilter::builder()
                .select(["VERTEX"])
                .execute(Predicate::is_equal("A"))
                .build(),
        );
        assert!(filter.test(&Entity::new("entity", "A").into()).unwrap());
        assert!(!filter.test(&Entity::new("entity", "B").into()).unwrap());
        assert!(!filter.test(&edge(1)).unwrap());
    }

    #[test]
    fn test_transform_leaves_other_groups() {
        let transform = Transform::new().entity(
            "entity",
            ElementTransformer::builder()
                .select(["prop1"])
                .execute(Function::Identity)
                .project(["prop3"])
                .build(),
        );
        let mut entity: Element = Entity::new("entity", "v").with_property("prop1", "value").into();
        transform.apply(&mut entity).unwrap();
        assert_eq!(entity.get_property("prop3"), Some(&PropertyValue::from("value")));
        assert_eq!(entity.get_property("prop1"), Some(&PropertyValue::from("value")));

        let mut other = edge(1);
        transform.apply(&mut other).unwrap();
        assert_eq!(other, edge(1));
    }

    #[test]
    fn test_aggregate_with_override() {
        let schema = Schema::builder()
            .type_def("string", TypeDefinition::new("String"))
            .type_def(
                "count",
                TypeDefinition::new("Integer").with_aggregate_function(BinaryOperator::Sum),
            )
            .edge(
                "edge",
                SchemaElementDefinition::edge("string", "string")
                    .property("count", "count")
                    .group_by(["count"]),
            )
            .build()
            .unwrap();

        let by_schema = Aggregate::new()
            .apply(vec![edge(3), edge(5), edge(3)], &schema)
            .unwrap();
        assert_eq!(by_schema.len(), 2);

        let merged = Aggregate::new()
            .edge("edge", AggregatePair::new().with_group_by(Vec::<String>::new()))
            .apply(vec![edge(3), edge(5)], &schema)
            .unwrap();
        assert_eq!(merged, vec![edge(8)]);
    }
}
