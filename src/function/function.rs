//! Mapping functions used by element transformers

use super::{expect_single, Custom, FunctionError, FunctionResult};
use crate::element::PropertyValue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Signature of runtime-registered mapping functions
pub type MapFn = dyn Fn(Vec<PropertyValue>) -> Vec<PropertyValue> + Send + Sync;

fn default_separator() -> String {
    ",".to_string()
}

/// Maps selected values to projected values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum Function {
    Identity,
    ToString,
    ToInteger,
    /// Joins the non-null selected values
    Concat {
        #[serde(default = "default_separator")]
        separator: String,
    },
    Constant {
        value: PropertyValue,
    },
    /// Length of a string, array or map; null has length zero
    Length,
    #[serde(skip)]
    Custom(Custom<MapFn>),
}

impl Function {
    pub fn custom(
        name: impl Into<String>,
        function: impl Fn(Vec<PropertyValue>) -> Vec<PropertyValue> + Send + Sync + 'static,
    ) -> Self {
        let function: Arc<MapFn> = Arc::new(function);
        Function::Custom(Custom::new(name, function))
    }

    pub fn name(&self) -> &str {
        match self {
            Function::Identity => "Identity",
            Function::ToString => "ToString",
            Function::ToInteger => "ToInteger",
            Function::Concat { .. } => "Concat",
            Function::Constant { .. } => "Constant",
            Function::Length => "Length",
            Function::Custom(custom) => custom.name(),
        }
    }

    pub fn apply(&self, values: Vec<PropertyValue>) -> FunctionResult<Vec<PropertyValue>> {
        match self {
            Function::Identity => Ok(values),
            Function::ToString => {
                let value = expect_single(self.name(), &values)?;
                Ok(vec![match value {
                    PropertyValue::Null => PropertyValue::Null,
                    PropertyValue::String(s) => PropertyValue::String(s),
                    other => PropertyValue::String(other.to_string()),
                }])
            }
            Function::ToInteger => {
                let value = expect_single(self.name(), &values)?;
                Ok(vec![self.to_integer(value)?])
            }
            Function::Concat { separator } => {
                let parts: Vec<String> = values
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(|v| match v {
                        PropertyValue::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                Ok(vec![PropertyValue::String(parts.join(separator))])
            }
            Function::Constant { value } => Ok(vec![value.clone()]),
            Function::Length => {
                let value = expect_single(self.name(), &values)?;
                let length = match &value {
                    PropertyValue::String(s) => s.chars().count(),
                    PropertyValue::Array(arr) => arr.len(),
                    PropertyValue::Map(map) => map.len(),
                    PropertyValue::Null => 0,
                    other => {
                        return Err(FunctionError::TypeMismatch {
                            function: self.name().to_string(),
                            found: other.type_name().to_string(),
                        })
                    }
                };
                Ok(vec![PropertyValue::Integer(length as i64)])
            }
            Function::Custom(custom) => Ok((custom.func())(values)),
        }
    }

    fn to_integer(&self, value: PropertyValue) -> FunctionResult<PropertyValue> {
        match value {
            PropertyValue::Null => Ok(PropertyValue::Null),
            PropertyValue::Integer(i) | PropertyValue::DateTime(i) => Ok(PropertyValue::Integer(i)),
            PropertyValue::Float(f) => Ok(PropertyValue::Integer(f.trunc() as i64)),
            PropertyValue::Boolean(b) => Ok(PropertyValue::Integer(b as i64)),
            PropertyValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map(PropertyValue::Integer)
                .map_err(|e| FunctionError::Apply {
                    function: self.name().to_string(),
                    message: format!("'{}' is not an integer: {}", s, e),
                }),
            other => Err(FunctionError::TypeMismatch {
                function: self.name().to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }
}
