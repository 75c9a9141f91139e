//! Per-group schema definitions

use crate::element::IdentifierType;
use crate::function::{ElementAggregator, ElementFilter};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

fn default_aggregate() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// Structural and aggregation metadata for one group
///
/// Entities declare `vertex`; edges declare `source`, `destination` and
/// optionally `directed`. Each names a type from the schema's `types`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaElementDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directed: Option<String>,
    /// Property name to type name, in declaration order
    #[serde(default)]
    pub properties: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    #[serde(default = "default_aggregate", skip_serializing_if = "is_true")]
    pub aggregate: bool,
    /// Replaces the per-type aggregate functions when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregator: Option<ElementAggregator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<ElementFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for SchemaElementDefinition {
    fn default() -> Self {
        SchemaElementDefinition {
            vertex: None,
            source: None,
            destination: None,
            directed: None,
            properties: IndexMap::new(),
            group_by: Vec::new(),
            aggregate: true,
            aggregator: None,
            validator: None,
            description: None,
        }
    }
}

impl SchemaElementDefinition {
    /// Entity definition with the given vertex type
    pub fn entity(vertex_type: impl Into<String>) -> Self {
        SchemaElementDefinition {
            vertex: Some(vertex_type.into()),
            ..Default::default()
        }
    }

    /// Edge definition with the given endpoint types
    pub fn edge(source_type: impl Into<String>, destination_type: impl Into<String>) -> Self {
        SchemaElementDefinition {
            source: Some(source_type.into()),
            destination: Some(destination_type.into()),
            ..Default::default()
        }
    }

    pub fn property(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.properties.insert(name.into(), type_name.into());
        self
    }

    pub fn group_by<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn aggregate(mut self, aggregate: bool) -> Self {
        self.aggregate = aggregate;
        self
    }

    pub fn aggregator(mut self, aggregator: ElementAggregator) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn validator(mut self, validator: ElementFilter) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn property_type(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Type name declared for an identifier
    pub fn identifier_type(&self, id: IdentifierType) -> Option<&str> {
        match id {
            IdentifierType::Vertex => self.vertex.as_deref(),
            IdentifierType::Source => self.source.as_deref(),
            IdentifierType::Destination => self.destination.as_deref(),
            IdentifierType::Directed => self.directed.as_deref(),
            _ => None,
        }
    }

    /// Declared identifiers with their type names
    pub fn identifiers(&self) -> impl Iterator<Item = (IdentifierType, &str)> {
        [
            IdentifierType::Vertex,
            IdentifierType::Source,
            IdentifierType::Destination,
            IdentifierType::Directed,
        ]
        .into_iter()
        .filter_map(move |id| self.identifier_type(id).map(|t| (id, t)))
    }

    /// Every type name the definition references
    pub fn referenced_types(&self) -> impl Iterator<Item = &str> {
        self.identifiers()
            .map(|(_, t)| t)
            .chain(self.properties.values().map(String::as_str))
    }
}
