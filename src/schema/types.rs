//! Property type definitions

use crate::element::PropertyValue;
use crate::function::{BinaryOperator, Predicate};
use serde::{Deserialize, Serialize};

/// Class name accepting any value type
pub const ANY_CLASS: &str = "Any";

/// Declared type of a property or identifier
///
/// `class` names a value type (`String`, `Integer`, ...). The aggregate
/// function is used for every property of this type unless the element
/// definition supplies its own aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_function: Option<BinaryOperator>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validate_functions: Vec<Predicate>,
    /// Codec name looked up in the codec registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialiser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TypeDefinition {
    pub fn new(class: impl Into<String>) -> Self {
        TypeDefinition {
            class: class.into(),
            aggregate_function: None,
            validate_functions: Vec::new(),
            serialiser: None,
            description: None,
        }
    }

    pub fn with_aggregate_function(mut self, operator: BinaryOperator) -> Self {
        self.aggregate_function = Some(operator);
        self
    }

    pub fn with_validate_function(mut self, predicate: Predicate) -> Self {
        self.validate_functions.push(predicate);
        self
    }

    pub fn with_serialiser(mut self, serialiser: impl Into<String>) -> Self {
        self.serialiser = Some(serialiser.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether `value` is of the declared class. Null always matches.
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        value.is_null() || self.class == ANY_CLASS || self.class == value.type_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_by_class() {
        let int_type = TypeDefinition::new("Integer");
        assert!(int_type.accepts(&PropertyValue::from(1i64)));
        assert!(!int_type.accepts(&PropertyValue::from("1")));
        assert!(int_type.accepts(&PropertyValue::Null));
        assert!(TypeDefinition::new(ANY_CLASS).accepts(&PropertyValue::from(true)));
    }

    #[test]
    fn test_json_field_names() {
        let def = TypeDefinition::new("Integer").with_aggregate_function(BinaryOperator::Sum);
        let json = serde_json::to_string(&def).unwrap();
        assert!(json.contains("\"aggregateFunction\""));
        let decoded: TypeDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, def);
    }
}
