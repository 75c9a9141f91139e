//! Predicates used by element filters

use super::{expect_single, Custom, FunctionResult};
use crate::element::PropertyValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Signature of runtime-registered predicates
pub type PredicateFn = dyn Fn(&[PropertyValue]) -> bool + Send + Sync;

/// Boolean test over the selected values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum Predicate {
    /// Every selected value is non-null
    Exists,
    IsEqual {
        value: PropertyValue,
    },
    IsMoreThan {
        value: PropertyValue,
        #[serde(default)]
        or_equal_to: bool,
    },
    IsLessThan {
        value: PropertyValue,
        #[serde(default)]
        or_equal_to: bool,
    },
    IsIn {
        values: Vec<PropertyValue>,
    },
    /// Value has the given type name, e.g. `Integer`
    IsA {
        type_name: String,
    },
    Not {
        predicate: Box<Predicate>,
    },
    And {
        predicates: Vec<Predicate>,
    },
    Or {
        predicates: Vec<Predicate>,
    },
    #[serde(skip)]
    Custom(Custom<PredicateFn>),
}

impl Predicate {
    pub fn is_more_than(value: impl Into<PropertyValue>) -> Self {
        Predicate::IsMoreThan {
            value: value.into(),
            or_equal_to: false,
        }
    }

    pub fn is_less_than(value: impl Into<PropertyValue>) -> Self {
        Predicate::IsLessThan {
            value: value.into(),
            or_equal_to: false,
        }
    }

    pub fn is_equal(value: impl Into<PropertyValue>) -> Self {
        Predicate::IsEqual {
            value: value.into(),
        }
    }

    pub fn custom(
        name: impl Into<String>,
        predicate: impl Fn(&[PropertyValue]) -> bool + Send + Sync + 'static,
    ) -> Self {
        let predicate: Arc<PredicateFn> = Arc::new(predicate);
        Predicate::Custom(Custom::new(name, predicate))
    }

    pub fn name(&self) -> &str {
        match self {
            Predicate::Exists => "Exists",
            Predicate::IsEqual { .. } => "IsEqual",
            Predicate::IsMoreThan { .. } => "IsMoreThan",
            Predicate::IsLessThan { .. } => "IsLessThan",
            Predicate::IsIn { .. } => "IsIn",
            Predicate::IsA { .. } => "IsA",
            Predicate::Not { .. } => "Not",
            Predicate::And { .. } => "And",
            Predicate::Or { .. } => "Or",
            Predicate::Custom(custom) => custom.name(),
        }
    }

    /// Evaluate against the selected values
    pub fn test(&self, values: &[PropertyValue]) -> FunctionResult<bool> {
        match self {
            Predicate::Exists => Ok(values.iter().all(|v| !v.is_null())),
            Predicate::IsEqual { value } => Ok(&expect_single(self.name(), values)? == value),
            Predicate::IsMoreThan { value, or_equal_to } => {
                let input = expect_single(self.name(), values)?;
                Ok(match compare_values(&input, value) {
                    Some(Ordering::Greater) => true,
                    Some(Ordering::Equal) => *or_equal_to,
                    _ => false,
                })
            }
            Predicate::IsLessThan { value, or_equal_to } => {
                let input = expect_single(self.name(), values)?;
                Ok(match compare_values(&input, value) {
                    Some(Ordering::Less) => true,
                    Some(Ordering::Equal) => *or_equal_to,
                    _ => false,
                })
            }
            Predicate::IsIn { values: allowed } => {
                let input = expect_single(self.name(), values)?;
                Ok(allowed.contains(&input))
            }
            Predicate::IsA { type_name } => {
                let input = expect_single(self.name(), values)?;
                Ok(input.type_name() == type_name)
            }
            Predicate::Not { predicate } => Ok(!predicate.test(values)?),
            Predicate::And { predicates } => {
                for predicate in predicates {
                    if !predicate.test(values)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or { predicates } => {
                for predicate in predicates {
                    if predicate.test(values)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Custom(custom) => Ok((custom.func())(values)),
        }
    }
}

/// Order two values when they are comparable.
///
/// Numbers compare numerically across integer and float; otherwise only
/// values of the same type compare. Nulls never compare.
pub fn compare_values(left: &PropertyValue, right: &PropertyValue) -> Option<Ordering> {
    if left.is_null() || right.is_null() {
        return None;
    }
    match (left, right) {
        (PropertyValue::Integer(a), PropertyValue::Integer(b)) => Some(a.cmp(b)),
        (PropertyValue::Integer(_) | PropertyValue::Float(_), PropertyValue::Integer(_) | PropertyValue::Float(_)) => {
            let (a, b) = (left.as_number()?, right.as_number()?);
            a.partial_cmp(&b)
        }
        _ if left.type_name() == right.type_name() => Some(left.cmp(right)),
        _ => None,
    }
}
