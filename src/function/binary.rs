//! Binary operators used by aggregators
//!
//! Operators merge an accumulated state with an incoming value. A `Null`
//! state yields the input and a `Null` input yields the state.

use super::predicate::compare_values;
use super::{Custom, FunctionError, FunctionResult};
use crate::element::PropertyValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Signature of runtime-registered binary operators over whole selections
pub type BinaryFn =
    dyn Fn(Vec<PropertyValue>, Vec<PropertyValue>) -> Vec<PropertyValue> + Send + Sync;

fn default_separator() -> String {
    ",".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum BinaryOperator {
    Sum,
    Product,
    Min,
    Max,
    /// Keeps the accumulated value
    First,
    /// Keeps the incoming value
    Last,
    And,
    Or,
    StringConcat {
        #[serde(default = "default_separator")]
        separator: String,
    },
    CollectionConcat,
    /// Unions maps by key, merging shared keys with `value_operator` or
    /// keeping the incoming value when none is set
    MapMerge {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value_operator: Option<Box<BinaryOperator>>,
    },
    #[serde(skip)]
    Custom(Custom<BinaryFn>),
}

impl BinaryOperator {
    pub fn custom(
        name: impl Into<String>,
        operator: impl Fn(Vec<PropertyValue>, Vec<PropertyValue>) -> Vec<PropertyValue>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let operator: Arc<BinaryFn> = Arc::new(operator);
        BinaryOperator::Custom(Custom::new(name, operator))
    }

    pub fn name(&self) -> &str {
        match self {
            BinaryOperator::Sum => "Sum",
            BinaryOperator::Product => "Product",
            BinaryOperator::Min => "Min",
            BinaryOperator::Max => "Max",
            BinaryOperator::First => "First",
            BinaryOperator::Last => "Last",
            BinaryOperator::And => "And",
            BinaryOperator::Or => "Or",
            BinaryOperator::StringConcat { .. } => "StringConcat",
            BinaryOperator::CollectionConcat => "CollectionConcat",
            BinaryOperator::MapMerge { .. } => "MapMerge",
            BinaryOperator::Custom(custom) => custom.name(),
        }
    }

    /// Merge selected values position by position.
    ///
    /// Custom operators receive the whole selections.
    pub fn apply(
        &self,
        state: Vec<PropertyValue>,
        input: Vec<PropertyValue>,
    ) -> FunctionResult<Vec<PropertyValue>> {
        if let BinaryOperator::Custom(custom) = self {
            return Ok((custom.func())(state, input));
        }
        if state.len() != input.len() {
            return Err(FunctionError::Arity {
                function: self.name().to_string(),
                expected: state.len(),
                actual: input.len(),
            });
        }
        state
            .into_iter()
            .zip(input)
            .map(|(s, i)| self.apply_value(s, i))
            .collect()
    }

    /// Merge a single pair of values
    pub fn apply_value(
        &self,
        state: PropertyValue,
        input: PropertyValue,
    ) -> FunctionResult<PropertyValue> {
        if input.is_null() {
            return Ok(state);
        }
        if state.is_null() {
            return Ok(input);
        }
        use PropertyValue::*;
        match (self, state, input) {
            (BinaryOperator::Sum, Integer(a), Integer(b)) => {
                a.checked_add(b).map(Integer).ok_or_else(|| self.overflow())
            }
            (BinaryOperator::Product, Integer(a), Integer(b)) => {
                a.checked_mul(b).map(Integer).ok_or_else(|| self.overflow())
            }
            (BinaryOperator::Sum, a @ (Integer(_) | Float(_)), b @ (Integer(_) | Float(_))) => {
                Ok(Float(number(&a) + number(&b)))
            }
            (BinaryOperator::Product, a @ (Integer(_) | Float(_)), b @ (Integer(_) | Float(_))) => {
                Ok(Float(number(&a) * number(&b)))
            }
            (BinaryOperator::Min, a, b) => match compare_values(&a, &b) {
                Some(Ordering::Greater) => Ok(b),
                Some(_) => Ok(a),
                None => Err(self.mismatch(&b)),
            },
            (BinaryOperator::Max, a, b) => match compare_values(&a, &b) {
                Some(Ordering::Less) => Ok(b),
                Some(_) => Ok(a),
                None => Err(self.mismatch(&b)),
            },
            (BinaryOperator::First, a, _) => Ok(a),
            (BinaryOperator::Last, _, b) => Ok(b),
            (BinaryOperator::And, Boolean(a), Boolean(b)) => Ok(Boolean(a && b)),
            (BinaryOperator::Or, Boolean(a), Boolean(b)) => Ok(Boolean(a || b)),
            (BinaryOperator::StringConcat { separator }, String(a), String(b)) => {
                Ok(String(format!("{}{}{}", a, separator, b)))
            }
            (BinaryOperator::CollectionConcat, Array(mut a), Array(b)) => {
                a.extend(b);
                Ok(Array(a))
            }
            (BinaryOperator::MapMerge { value_operator }, Map(mut a), Map(b)) => {
                for (key, incoming) in b {
                    let merged = match (a.remove(&key), value_operator) {
                        (Some(existing), Some(op)) => op.apply_value(existing, incoming)?,
                        _ => incoming,
                    };
                    a.insert(key, merged);
                }
                Ok(Map(a))
            }
            (_, _, b) => Err(self.mismatch(&b)),
        }
    }

    fn overflow(&self) -> FunctionError {
        FunctionError::Apply {
            function: self.name().to_string(),
            message: "integer overflow".to_string(),
        }
    }

    fn mismatch(&self, found: &PropertyValue) -> FunctionError {
        FunctionError::TypeMismatch {
            function: self.name().to_string(),
            found: found.type_name().to_string(),
        }
    }
}

fn number(value: &PropertyValue) -> f64 {
    value.as_number().unwrap_or(0.0)
}
