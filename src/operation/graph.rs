//! Graph administration operations

use super::payload::PayloadType;
use super::{Operation, Options};
use crate::schema::Schema;
use crate::store::StoreProperties;
use indexmap::IndexSet;
use std::any::Any;

/// Schema of the graph; for a federated store, the merge of its constituents
#[derive(Debug, Clone, Default)]
pub struct GetSchema {
    pub options: Options,
}

impl GetSchema {
    pub fn new() -> Self {
        GetSchema::default()
    }
}

impl Operation for GetSchema {
    fn class(&self) -> &'static str {
        "GetSchema"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn output_type(&self) -> PayloadType {
        PayloadType::Schema
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

/// Ids of the constituent graphs the user may see
#[derive(Debug, Clone, Default)]
pub struct GetAllGraphIds {
    pub options: Options,
}

impl GetAllGraphIds {
    pub fn new() -> Self {
        GetAllGraphIds::default()
    }
}

impl Operation for GetAllGraphIds {
    fn class(&self) -> &'static str {
        "GetAllGraphIds"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn output_type(&self) -> PayloadType {
        PayloadType::Strings
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

/// Register a new constituent graph
///
/// A missing schema or store properties is looked up in the graph library,
/// first under the parent ids and then under the graph id.
#[derive(Debug, Clone, Default)]
pub struct AddGraph {
    pub graph_id: String,
    pub schema: Option<Schema>,
    pub store_properties: Option<StoreProperties>,
    pub parent_schema_ids: Vec<String>,
    pub parent_properties_id: Option<String>,
    pub graph_auths: IndexSet<String>,
    pub is_public: bool,
    pub options: Options,
}

impl AddGraph {
    pub fn new(graph_id: impl Into<String>) -> Self {
        AddGraph {
            graph_id: graph_id.into(),
            ..Default::default()
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_store_properties(mut self, properties: StoreProperties) -> Self {
        self.store_properties = Some(properties);
        self
    }

    pub fn with_parent_schema_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent_schema_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parent_properties_id(mut self, id: impl Into<String>) -> Self {
        self.parent_properties_id = Some(id.into());
        self
    }

    pub fn with_graph_auths<I, S>(mut self, auths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.graph_auths = auths.into_iter().map(Into::into).collect();
        self
    }

    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }
}

impl Operation for AddGraph {
    fn class(&self) -> &'static str {
        "AddGraph"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn output_type(&self) -> PayloadType {
        PayloadType::Empty
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

/// Unregister a constituent graph
#[derive(Debug, Clone, Default)]
pub struct RemoveGraph {
    pub graph_id: String,
    pub options: Options,
}

impl RemoveGraph {
    pub fn new(graph_id: impl Into<String>) -> Self {
        RemoveGraph {
            graph_id: graph_id.into(),
            options: Options::new(),
        }
    }
}

impl Operation for RemoveGraph {
    fn class(&self) -> &'static str {
        "RemoveGraph"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn output_type(&self) -> PayloadType {
        PayloadType::Empty
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
