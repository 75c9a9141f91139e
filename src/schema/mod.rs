//! Graph schema
//!
//! Maps each group to its structural and aggregation metadata and names the
//! property types those definitions reference. A schema is validated when it
//! is built or decoded and is immutable afterwards.

pub mod codec;
pub mod definition;
pub mod types;

pub use codec::{BincodeCodec, CodecRegistry, JsonCodec, PropertyCodec};
pub use definition::SchemaElementDefinition;
pub use types::{TypeDefinition, ANY_CLASS};

use crate::element::{is_reserved_name, Element, PropertyValue};
use crate::function::{ElementAggregator, FunctionError, TupleAdapted};
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Schema errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Property name outside `[a-zA-Z0-9|]*`
    #[error("Property name '{property}' in group '{group}' contains invalid characters; allowed: [a-zA-Z0-9|]")]
    InvalidPropertyName { group: String, property: String },

    /// Property name clashes with an identifier or pseudo-field
    #[error("Property name '{property}' in group '{group}' is reserved")]
    ReservedPropertyName { group: String, property: String },

    /// groupBy refers to an undeclared property
    #[error("Group '{group}' groups by '{property}' which is not a property of the group")]
    UnknownGroupByProperty { group: String, property: String },

    /// Definition references an undeclared type
    #[error("Group '{group}' references type '{type_name}' which is not declared in the schema")]
    UnknownType { group: String, type_name: String },

    /// Aggregated group lacks an aggregate function for a property
    #[error("Group '{group}' is aggregated but property '{property}' has no aggregate function")]
    MissingAggregateFunction { group: String, property: String },

    /// Group declared as both entity and edge
    #[error("Group '{0}' is declared as both an entity and an edge")]
    DuplicateGroup(String),

    /// Definition is neither a valid entity nor a valid edge
    #[error("Group '{group}' has an invalid definition: {reason}")]
    InvalidDefinition { group: String, reason: String },

    /// Group absent from the schema
    #[error("Received group {0} which was not found in the schema")]
    GroupNotFound(String),

    /// Element failed validation
    #[error("Element of group '{group}' is invalid: {reason}")]
    InvalidElement { group: String, reason: String },

    /// Two schemas disagree and cannot be merged
    #[error("Unable to merge schemas: {0}")]
    MergeConflict(String),

    /// Encoded schema or value could not be decoded or encoded
    #[error("Schema format error: {0}")]
    Format(String),

    /// Function error raised by a validator
    #[error("Function error: {0}")]
    Function(#[from] FunctionError),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

static PROPERTY_NAME: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9|]*$"));

fn is_valid_property_name(name: &str) -> bool {
    PROPERTY_NAME.as_ref().map_or(false, |re| re.is_match(name))
}

/// Graph schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    entities: IndexMap<String, SchemaElementDefinition>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    edges: IndexMap<String, SchemaElementDefinition>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    types: IndexMap<String, TypeDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    visibility_property: Option<String>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Decode and validate a JSON-encoded schema
    pub fn from_json(bytes: &[u8]) -> SchemaResult<Schema> {
        let schema: Schema =
            serde_json::from_slice(bytes).map_err(|e| SchemaError::Format(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn to_json(&self) -> SchemaResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| SchemaError::Format(e.to_string()))
    }

    /// Decode and validate a YAML-encoded schema
    pub fn from_yaml(text: &str) -> SchemaResult<Schema> {
        let schema: Schema =
            serde_yaml::from_str(text).map_err(|e| SchemaError::Format(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Definition for a group, entity or edge
    pub fn element(&self, group: &str) -> Option<&SchemaElementDefinition> {
        self.entities.get(group).or_else(|| self.edges.get(group))
    }

    pub fn entity(&self, group: &str) -> Option<&SchemaElementDefinition> {
        self.entities.get(group)
    }

    pub fn edge(&self, group: &str) -> Option<&SchemaElementDefinition> {
        self.edges.get(group)
    }

    pub fn entity_groups(&self) -> impl Iterator<Item = &String> {
        self.entities.keys()
    }

    pub fn edge_groups(&self) -> impl Iterator<Item = &String> {
        self.edges.keys()
    }

    /// All groups, entities first
    pub fn groups(&self) -> IndexSet<String> {
        self.entities.keys().chain(self.edges.keys()).cloned().collect()
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.element(group).is_some()
    }

    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn types(&self) -> &IndexMap<String, TypeDefinition> {
        &self.types
    }

    pub fn visibility_property(&self) -> Option<&str> {
        self.visibility_property.as_deref()
    }

    /// Groups whose elements are merged by aggregation
    pub fn aggregated_groups(&self) -> IndexSet<String> {
        self.entities
            .iter()
            .chain(self.edges.iter())
            .filter(|(_, def)| def.aggregate)
            .map(|(group, _)| group.clone())
            .collect()
    }

    /// Ingest grouping columns: the declared groupBy plus the visibility
    /// property when the group carries it.
    pub fn ingest_group_by(&self, group: &str) -> SchemaResult<Vec<String>> {
        let def = self
            .element(group)
            .ok_or_else(|| SchemaError::GroupNotFound(group.to_string()))?;
        let mut group_by = def.group_by.clone();
        if let Some(visibility) = self.visibility_property.as_deref() {
            if def.has_property(visibility) && !group_by.iter().any(|p| p == visibility) {
                group_by.push(visibility.to_string());
            }
        }
        Ok(group_by)
    }

    /// Aggregator merging every property outside the ingest groupBy
    pub fn ingest_aggregator(&self, group: &str) -> SchemaResult<ElementAggregator> {
        let group_by = self.ingest_group_by(group)?;
        self.aggregator_excluding(group, &group_by, &ElementAggregator::default())
    }

    /// Query-time aggregator: the view's components first, then schema
    /// components for properties neither grouped by the view nor covered by
    /// the view's aggregator.
    pub fn query_aggregator(
        &self,
        group: &str,
        view_group_by: &[String],
        view_aggregator: Option<&ElementAggregator>,
    ) -> SchemaResult<ElementAggregator> {
        let base = view_aggregator.cloned().unwrap_or_default();
        self.aggregator_excluding(group, view_group_by, &base)
    }

    fn aggregator_excluding(
        &self,
        group: &str,
        group_by: &[String],
        base: &ElementAggregator,
    ) -> SchemaResult<ElementAggregator> {
        let def = self
            .element(group)
            .ok_or_else(|| SchemaError::GroupNotFound(group.to_string()))?;
        let mut aggregator = base.clone();
        let excluded = |property: &str| {
            group_by.iter().any(|g| g == property) || base.covers(property)
        };

        if let Some(explicit) = &def.aggregator {
            for component in &explicit.components {
                if component.selection.iter().all(|p| !excluded(p)) {
                    aggregator.push(component.clone());
                }
            }
            return Ok(aggregator);
        }

        for (property, type_name) in &def.properties {
            if excluded(property) {
                continue;
            }
            let operator = self
                .types
                .get(type_name)
                .and_then(|t| t.aggregate_function.clone());
            if let Some(operator) = operator {
                aggregator.push(TupleAdapted::new(vec![property.clone()], operator));
            }
        }
        Ok(aggregator)
    }

    /// Check structural rules across every definition
    pub fn validate(&self) -> SchemaResult<()> {
        for group in self.entities.keys() {
            if self.edges.contains_key(group) {
                return Err(SchemaError::DuplicateGroup(group.clone()));
            }
        }
        for (group, def) in &self.entities {
            if def.vertex.is_none() || def.source.is_some() || def.destination.is_some() {
                return Err(SchemaError::InvalidDefinition {
                    group: group.clone(),
                    reason: "an entity declares exactly one vertex type".to_string(),
                });
            }
            self.validate_definition(group, def)?;
        }
        for (group, def) in &self.edges {
            if def.source.is_none() || def.destination.is_none() || def.vertex.is_some() {
                return Err(SchemaError::InvalidDefinition {
                    group: group.clone(),
                    reason: "an edge declares a source and a destination type".to_string(),
                });
            }
            self.validate_definition(group, def)?;
        }
        Ok(())
    }

    fn validate_definition(&self, group: &str, def: &SchemaElementDefinition) -> SchemaResult<()> {
        for property in def.properties.keys() {
            if !is_valid_property_name(property) {
                return Err(SchemaError::InvalidPropertyName {
                    group: group.to_string(),
                    property: property.clone(),
                });
            }
            if is_reserved_name(property) {
                return Err(SchemaError::ReservedPropertyName {
                    group: group.to_string(),
                    property: property.clone(),
                });
            }
        }
        for type_name in def.referenced_types() {
            if !self.types.contains_key(type_name) {
                return Err(SchemaError::UnknownType {
                    group: group.to_string(),
                    type_name: type_name.to_string(),
                });
            }
        }
        for property in &def.group_by {
            if !def.has_property(property) {
                return Err(SchemaError::UnknownGroupByProperty {
                    group: group.to_string(),
                    property: property.clone(),
                });
            }
        }
        if let Some(aggregator) = &def.aggregator {
            aggregator.validate()?;
        }
        if let Some(validator) = &def.validator {
            validator.validate()?;
        }
        if def.aggregate && def.aggregator.is_none() {
            let group_by = self.ingest_group_by(group)?;
            for (property, type_name) in &def.properties {
                if group_by.contains(property) {
                    continue;
                }
                let has_function = self
                    .types
                    .get(type_name)
                    .map_or(false, |t| t.aggregate_function.is_some());
                if !has_function {
                    return Err(SchemaError::MissingAggregateFunction {
                        group: group.to_string(),
                        property: property.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate an element against its group's declared types and validators
    pub fn validate_element(&self, element: &Element) -> SchemaResult<()> {
        let group = element.group();
        let invalid = |reason: String| SchemaError::InvalidElement {
            group: group.to_string(),
            reason,
        };
        let def = match element {
            Element::Entity(_) => self.entities.get(group),
            Element::Edge(_) => self.edges.get(group),
        }
        .ok_or_else(|| SchemaError::GroupNotFound(group.to_string()))?;

        for (id, type_name) in def.identifiers() {
            let value = element.get_identifier(id);
            self.check_value(type_name, &value)
                .map_err(|reason| invalid(format!("identifier {}: {}", id, reason)))?;
        }
        for (name, value) in element.properties().iter() {
            let type_name = def
                .property_type(name)
                .ok_or_else(|| invalid(format!("property '{}' is not declared", name)))?;
            self.check_value(type_name, value)
                .map_err(|reason| invalid(format!("property '{}': {}", name, reason)))?;
        }
        if let Some(validator) = &def.validator {
            if !validator.test(element)? {
                return Err(invalid("element validator rejected the element".to_string()));
            }
        }
        Ok(())
    }

    fn check_value(&self, type_name: &str, value: &PropertyValue) -> Result<(), String> {
        let type_def = self
            .types
            .get(type_name)
            .ok_or_else(|| format!("type '{}' is not declared", type_name))?;
        if !type_def.accepts(value) {
            return Err(format!(
                "expected {} but found {}",
                type_def.class,
                value.type_name()
            ));
        }
        for predicate in &type_def.validate_functions {
            match predicate.test(std::slice::from_ref(value)) {
                Ok(true) => {}
                Ok(false) => return Err(format!("{} rejected {}", predicate.name(), value)),
                Err(e) => return Err(e.to_string()),
            }
        }
        Ok(())
    }

    /// Combine two schemas. Shared groups and types must agree.
    pub fn merge(&self, other: &Schema) -> SchemaResult<Schema> {
        let mut merged = self.clone();
        for (name, def) in &other.types {
            match merged.types.get(name) {
                Some(existing) if existing != def => {
                    return Err(SchemaError::MergeConflict(format!(
                        "type '{}' has conflicting definitions",
                        name
                    )))
                }
                Some(_) => {}
                None => {
                    merged.types.insert(name.clone(), def.clone());
                }
            }
        }
        for (target, source) in [
            (&mut merged.entities, &other.entities),
            (&mut merged.edges, &other.edges),
        ] {
            for (group, def) in source {
                match target.get(group) {
                    Some(existing) if existing != def => {
                        return Err(SchemaError::MergeConflict(format!(
                            "group '{}' has conflicting definitions",
                            group
                        )))
                    }
                    Some(_) => {}
                    None => {
                        target.insert(group.clone(), def.clone());
                    }
                }
            }
        }
        merged.visibility_property = match (&self.visibility_property, &other.visibility_property) {
            (Some(a), Some(b)) if a != b => {
                return Err(SchemaError::MergeConflict(format!(
                    "visibility properties '{}' and '{}' differ",
                    a, b
                )))
            }
            (a, b) => a.clone().or_else(|| b.clone()),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// Builder producing a validated schema
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn entity(mut self, group: impl Into<String>, def: SchemaElementDefinition) -> Self {
        self.schema.entities.insert(group.into(), def);
        self
    }

    pub fn edge(mut self, group: impl Into<String>, def: SchemaElementDefinition) -> Self {
        self.schema.edges.insert(group.into(), def);
        self
    }

    pub fn type_def(mut self, name: impl Into<String>, def: TypeDefinition) -> Self {
        self.schema.types.insert(name.into(), def);
        self
    }

    pub fn visibility_property(mut self, property: impl Into<String>) -> Self {
        self.schema.visibility_property = Some(property.into());
        self
    }

    pub fn build(self) -> SchemaResult<Schema> {
        self.schema.validate()?;
        Ok(self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Edge, Entity};
    use crate::function::{BinaryOperator, Predicate};

    fn base_types() -> SchemaBuilder {
        Schema::builder()
            .type_def("vertex.string", TypeDefinition::new("String"))
            .type_def(
                "count.long",
                TypeDefinition::new("Integer").with_aggregate_function(BinaryOperator::Sum),
            )
            .type_def(
                "visibility",
                TypeDefinition::new("String").with_aggregate_function(BinaryOperator::First),
            )
    }

    #[test]
    fn test_invalid_property_name() {
        let result = base_types()
            .edge(
                "edge",
                SchemaElementDefinition::edge("vertex.string", "vertex.string")
                    .property("bad-name", "count.long"),
            )
            .build();
        assert!(matches!(result, Err(SchemaError::InvalidPropertyName { .. })));

        let result = base_types()
            .edge(
                "edge",
                SchemaElementDefinition::edge("vertex.string", "vertex.string")
                    .property("a|b", "count.long"),
            )
            .build();
        assert!(result.is_ok(), "pipe is allowed: {:?}", result.err());
    }

    #[test]
    fn test_reserved_property_name() {
        let result = base_types()
            .entity(
                "entity",
                SchemaElementDefinition::entity("vertex.string").property("SOURCE", "count.long"),
            )
            .build();
        assert!(matches!(result, Err(SchemaError::ReservedPropertyName { .. })));
    }

    #[test]
    fn test_group_by_must_exist() {
        let result = base_types()
            .entity(
                "entity",
                SchemaElementDefinition::entity("vertex.string").group_by(["missing"]),
            )
            .build();
        assert!(matches!(result, Err(SchemaError::UnknownGroupByProperty { .. })));
    }

    #[test]
    fn test_aggregation_must_be_complete() {
        let result = base_types()
            .entity(
                "entity",
                SchemaElementDefinition::entity("vertex.string").property("name", "vertex.string"),
            )
            .build();
        assert!(matches!(result, Err(SchemaError::MissingAggregateFunction { .. })));

        let result = base_types()
            .entity(
                "entity",
                SchemaElementDefinition::entity("vertex.string")
                    .property("name", "vertex.string")
                    .aggregate(false),
            )
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_aggregated_groups_and_ingest_group_by() {
        let schema = base_types()
            .visibility_property("vis")
            .edge(
                "edge",
                SchemaElementDefinition::edge("vertex.string", "vertex.string")
                    .property("count", "count.long")
                    .property("vis", "visibility"),
            )
            .entity(
                "plain",
                SchemaElementDefinition::entity("vertex.string").aggregate(false),
            )
            .build()
            .unwrap();

        let aggregated = schema.aggregated_groups();
        assert!(aggregated.contains("edge"));
        assert!(!aggregated.contains("plain"));
        assert_eq!(schema.ingest_group_by("edge").unwrap(), vec!["vis".to_string()]);
        assert!(schema.ingest_group_by("plain").unwrap().is_empty());
        assert_eq!(
            schema.ingest_group_by("nope"),
            Err(SchemaError::GroupNotFound("nope".into()))
        );

        let aggregator = schema.ingest_aggregator("edge").unwrap();
        assert_eq!(aggregator.components.len(), 1);
        assert_eq!(aggregator.components[0].selection, vec!["count".to_string()]);
    }

    #[test]
    fn test_validate_element() {
        let schema = base_types()
            .type_def(
                "positive",
                TypeDefinition::new("Integer")
                    .with_aggregate_function(BinaryOperator::Max)
                    .with_validate_function(Predicate::is_more_than(0i64)),
            )
            .edge(
                "edge",
                SchemaElementDefinition::edge("vertex.string", "vertex.string")
                    .property("count", "count.long")
                    .property("weight", "positive"),
            )
            .build()
            .unwrap();

        let valid: Element = Edge::new("edge", "A", "B", true)
            .with_property("count", 1i64)
            .with_property("weight", 2i64)
            .into();
        assert!(schema.validate_element(&valid).is_ok());

        let wrong_type: Element = Edge::new("edge", "A", "B", true)
            .with_property("count", "one")
            .into();
        assert!(schema.validate_element(&wrong_type).is_err());

        let rejected: Element = Edge::new("edge", "A", "B", true)
            .with_property("weight", -1i64)
            .into();
        assert!(schema.validate_element(&rejected).is_err());

        let wrong_kind: Element = Entity::new("edge", "A").into();
        assert!(schema.validate_element(&wrong_kind).is_err());
    }

    #[test]
    fn test_json_round_trip_and_format_error() {
        let schema = base_types()
            .edge(
                "edge",
                SchemaElementDefinition::edge("vertex.string", "vertex.string")
                    .property("count", "count.long")
                    .group_by(Vec::<String>::new()),
            )
            .build()
            .unwrap();
        let bytes = schema.to_json().unwrap();
        assert_eq!(Schema::from_json(&bytes).unwrap(), schema);

        assert!(matches!(
            Schema::from_json(b"{not json"),
            Err(SchemaError::Format(_))
        ));
    }

    #[test]
    fn test_merge() {
        let first = base_types()
            .entity("a", SchemaElementDefinition::entity("vertex.string"))
            .build()
            .unwrap();
        let second = base_types()
            .entity("b", SchemaElementDefinition::entity("vertex.string"))
            .build()
            .unwrap();
        let merged = first.merge(&second).unwrap();
        assert!(merged.has_group("a") && merged.has_group("b"));

        let conflicting = base_types()
            .entity(
                "a",
                SchemaElementDefinition::entity("vertex.string").description("other"),
            )
            .build()
            .unwrap();
        assert!(matches!(
            first.merge(&conflicting),
            Err(SchemaError::MergeConflict(_))
        ));
    }
}
