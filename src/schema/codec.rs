//! Property codecs keyed by type
//!
//! Backends that persist properties look codecs up by the `serialiser` name
//! of a property's type. The pipeline itself never encodes or decodes values.

use super::{Schema, SchemaError, SchemaResult};
use crate::element::PropertyValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Encodes and decodes property values
pub trait PropertyCodec: Send + Sync {
    fn name(&self) -> &str;

    fn encode(&self, value: &PropertyValue) -> SchemaResult<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> SchemaResult<PropertyValue>;
}

/// Default codec backed by bincode
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeCodec;

impl PropertyCodec for BincodeCodec {
    fn name(&self) -> &str {
        "bincode"
    }

    fn encode(&self, value: &PropertyValue) -> SchemaResult<Vec<u8>> {
        bincode::serialize(value).map_err(|e| SchemaError::Format(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> SchemaResult<PropertyValue> {
        bincode::deserialize(bytes).map_err(|e| SchemaError::Format(e.to_string()))
    }
}

/// Codec for JSON-encoded values
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl PropertyCodec for JsonCodec {
    fn name(&self) -> &str {
        "json"
    }

    fn encode(&self, value: &PropertyValue) -> SchemaResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| SchemaError::Format(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> SchemaResult<PropertyValue> {
        serde_json::from_slice(bytes).map_err(|e| SchemaError::Format(e.to_string()))
    }
}

/// Registry of codecs by name with a fallback
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn PropertyCodec>>,
    fallback: Arc<dyn PropertyCodec>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = CodecRegistry {
            codecs: HashMap::new(),
            fallback: Arc::new(BincodeCodec),
        };
        registry.register(Arc::new(BincodeCodec));
        registry.register(Arc::new(JsonCodec));
        registry
    }
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, codec: Arc<dyn PropertyCodec>) {
        self.codecs.insert(codec.name().to_string(), codec);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PropertyCodec>> {
        self.codecs.get(name).cloned()
    }

    /// Codec for a property of `group`, from its type's serialiser name
    pub fn for_property(
        &self,
        schema: &Schema,
        group: &str,
        property: &str,
    ) -> SchemaResult<Arc<dyn PropertyCodec>> {
        let def = schema
            .element(group)
            .ok_or_else(|| SchemaError::GroupNotFound(group.to_string()))?;
        let serialiser = def
            .property_type(property)
            .and_then(|t| schema.type_definition(t))
            .and_then(|t| t.serialiser.as_deref());
        match serialiser {
            Some(name) => self.get(name).ok_or_else(|| {
                SchemaError::Format(format!("no codec registered under '{}'", name))
            }),
            None => Ok(Arc::clone(&self.fallback)),
        }
    }
}
