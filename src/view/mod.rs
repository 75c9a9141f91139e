//! Query-time views
//!
//! A view selects the groups a query touches and overrides, per group, the
//! schema's grouping together with the filter, aggregation and transform
//! slots. Groups without their own definition pick up the global definition
//! when it applies to them.

pub mod definition;

pub use definition::{ViewElementDefinition, ViewElementDefinitionBuilder};

use crate::function::FunctionError;
use crate::schema::{Schema, SchemaError};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

/// View errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    /// Both property selection modes set on one definition
    #[error("You cannot set both properties and excludeProperties")]
    PropertiesAndExcludeProperties,

    /// A filter, aggregator or transformer slot was set twice
    #[error("{0} has already been set")]
    SlotAlreadySet(&'static str),

    /// Group declared as both entity and edge
    #[error("Group '{0}' is declared as both an entity and an edge")]
    DuplicateGroup(String),

    /// View refers to a group the schema does not declare
    #[error("View group '{0}' was not found in the schema")]
    GroupNotInSchema(String),

    /// Encoded view could not be decoded or encoded
    #[error("View format error: {0}")]
    Format(String),

    #[error("Function error: {0}")]
    Function(#[from] FunctionError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

pub type ViewResult<T> = Result<T, ViewError>;

/// Definition applied to every group lacking its own
///
/// When `groups` is set the definition only applies to those groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalViewElementDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<IndexSet<String>>,
    #[serde(flatten)]
    pub definition: ViewElementDefinition,
}

impl GlobalViewElementDefinition {
    pub fn new(definition: ViewElementDefinition) -> Self {
        GlobalViewElementDefinition {
            groups: None,
            definition,
        }
    }

    pub fn applies_to(&self, group: &str) -> bool {
        self.groups.as_ref().map_or(true, |g| g.contains(group))
    }
}

/// A query view
///
/// A view listing no groups places no restriction on which groups are read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    entities: IndexMap<String, ViewElementDefinition>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    edges: IndexMap<String, ViewElementDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    global_elements: Option<GlobalViewElementDefinition>,
}

impl View {
    pub fn builder() -> ViewBuilder {
        ViewBuilder::default()
    }

    /// Decode and validate a JSON-encoded view
    pub fn from_json(bytes: &[u8]) -> ViewResult<View> {
        let view: View =
            serde_json::from_slice(bytes).map_err(|e| ViewError::Format(e.to_string()))?;
        view.validate()?;
        Ok(view)
    }

    pub fn to_json(&self) -> ViewResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| ViewError::Format(e.to_string()))
    }

    /// Groups named explicitly, entities first
    pub fn groups(&self) -> IndexSet<String> {
        self.entities.keys().chain(self.edges.keys()).cloned().collect()
    }

    pub fn entity_groups(&self) -> impl Iterator<Item = &String> {
        self.entities.keys()
    }

    pub fn edge_groups(&self) -> impl Iterator<Item = &String> {
        self.edges.keys()
    }

    /// Whether the view lists no groups
    pub fn is_unrestricted(&self) -> bool {
        self.entities.is_empty() && self.edges.is_empty()
    }

    pub fn includes_group(&self, group: &str) -> bool {
        self.is_unrestricted() || self.entities.contains_key(group) || self.edges.contains_key(group)
    }

    pub fn global_elements(&self) -> Option<&GlobalViewElementDefinition> {
        self.global_elements.as_ref()
    }

    /// Definition governing `group`: its own, else the applicable global
    /// definition, else one that places no restriction.
    pub fn get_element(&self, group: &str) -> Cow<'_, ViewElementDefinition> {
        if let Some(def) = self.entities.get(group).or_else(|| self.edges.get(group)) {
            return Cow::Borrowed(def);
        }
        match &self.global_elements {
            Some(global) if global.applies_to(group) => Cow::Borrowed(&global.definition),
            _ => Cow::Owned(ViewElementDefinition::default()),
        }
    }

    /// Query grouping columns: the view's override, else the schema's ingest
    /// groupBy.
    pub fn query_group_by(&self, group: &str, schema: &Schema) -> ViewResult<Vec<String>> {
        match &self.get_element(group).group_by {
            Some(group_by) => Ok(group_by.clone()),
            None => Ok(schema.ingest_group_by(group)?),
        }
    }

    /// Copy of the view keeping only the listed groups in `groups`
    pub fn restrict_to_groups(&self, groups: &IndexSet<String>) -> View {
        View {
            entities: self
                .entities
                .iter()
                .filter(|(g, _)| groups.contains(*g))
                .map(|(g, d)| (g.clone(), d.clone()))
                .collect(),
            edges: self
                .edges
                .iter()
                .filter(|(g, _)| groups.contains(*g))
                .map(|(g, d)| (g.clone(), d.clone()))
                .collect(),
            global_elements: self.global_elements.clone(),
        }
    }

    pub fn has_post_aggregation_filters(&self) -> bool {
        self.entities
            .values()
            .chain(self.edges.values())
            .chain(self.global_elements.iter().map(|g| &g.definition))
            .any(|def| def.has_post_aggregation_filters())
    }

    pub fn validate(&self) -> ViewResult<()> {
        for group in self.entities.keys() {
            if self.edges.contains_key(group) {
                return Err(ViewError::DuplicateGroup(group.clone()));
            }
        }
        for def in self.entities.values().chain(self.edges.values()) {
            def.validate()?;
        }
        if let Some(global) = &self.global_elements {
            global.definition.validate()?;
        }
        Ok(())
    }

    /// Check every listed group exists in `schema`
    pub fn validate_against(&self, schema: &Schema) -> ViewResult<()> {
        for group in self.entities.keys() {
            if schema.entity(group).is_none() {
                return Err(ViewError::GroupNotInSchema(group.clone()));
            }
        }
        for group in self.edges.keys() {
            if schema.edge(group).is_none() {
                return Err(ViewError::GroupNotInSchema(group.clone()));
            }
        }
        Ok(())
    }
}

/// Builder for [`View`]
#[derive(Debug, Default)]
pub struct ViewBuilder {
    view: View,
}

impl ViewBuilder {
    pub fn entity(mut self, group: impl Into<String>, def: ViewElementDefinition) -> Self {
        self.view.entities.insert(group.into(), def);
        self
    }

    pub fn edge(mut self, group: impl Into<String>, def: ViewElementDefinition) -> Self {
        self.view.edges.insert(group.into(), def);
        self
    }

    /// Entity group with no overrides
    pub fn entity_group(self, group: impl Into<String>) -> Self {
        self.entity(group, ViewElementDefinition::default())
    }

    /// Edge group with no overrides
    pub fn edge_group(self, group: impl Into<String>) -> Self {
        self.edge(group, ViewElementDefinition::default())
    }

    pub fn global_elements(mut self, global: GlobalViewElementDefinition) -> Self {
        self.view.global_elements = Some(global);
        self
    }

    pub fn build(self) -> ViewResult<View> {
        self.view.validate()?;
        Ok(self.view)
    }
}
