//! Element aggregators
//!
//! Aggregation is in place and self-projecting: each component merges the
//! selected fields of the incoming tuple into the same fields of the state.

use super::adapted::{to_names, TupleAdapted};
use super::binary::BinaryOperator;
use super::{expect_outputs, FunctionError, FunctionResult};
use crate::element::Tuple;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementAggregator {
    pub components: Vec<TupleAdapted<BinaryOperator>>,
}

impl ElementAggregator {
    pub fn builder() -> AggregatorBuilder {
        AggregatorBuilder {
            aggregator: ElementAggregator::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Merge `input` into `state` and hand the state back.
    ///
    /// The state is moved in and returned; callers must use the returned
    /// value, not a prior copy of the state.
    pub fn apply<T: Tuple>(&self, mut state: T, input: &T) -> FunctionResult<T> {
        self.apply_in_place(&mut state, input)?;
        Ok(state)
    }

    /// Merge `input` into `state` where it lies
    pub fn apply_in_place<T: Tuple>(&self, state: &mut T, input: &T) -> FunctionResult<()> {
        for component in &self.components {
            let current = state.select(&component.selection);
            let incoming = input.select(&component.selection);
            let merged = component.function.apply(current, incoming)?;
            expect_outputs(component.function.name(), &component.selection, &merged)?;
            state.project(&component.selection, merged);
        }
        Ok(())
    }

    pub fn validate(&self) -> FunctionResult<()> {
        for component in &self.components {
            if component.selection.is_empty() {
                return Err(FunctionError::EmptySelection(
                    component.function.name().to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Whether some component already aggregates `field`
    pub fn covers(&self, field: &str) -> bool {
        self.components
            .iter()
            .any(|c| c.selection.iter().any(|s| s == field))
    }

    pub fn push(&mut self, component: TupleAdapted<BinaryOperator>) {
        self.components.push(component);
    }
}

/// Builder accepting the next selection
pub struct AggregatorBuilder {
    aggregator: ElementAggregator,
}

impl AggregatorBuilder {
    pub fn select<I, S>(self, selection: I) -> SelectedAggregatorBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectedAggregatorBuilder {
            aggregator: self.aggregator,
            selection: to_names(selection),
        }
    }

    pub fn build(self) -> ElementAggregator {
        self.aggregator
    }
}

/// Builder holding a selection and waiting for its operator
pub struct SelectedAggregatorBuilder {
    aggregator: ElementAggregator,
    selection: Vec<String>,
}

impl SelectedAggregatorBuilder {
    pub fn execute(mut self, operator: BinaryOperator) -> AggregatorBuilder {
        self.aggregator
            .components
            .push(TupleAdapted::new(self.selection, operator));
        AggregatorBuilder {
            aggregator: self.aggregator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Edge, Element, Properties, PropertyValue};

    #[test]
    fn test_aggregates_in_place() {
        let aggregator = ElementAggregator::builder()
            .select(["count"])
            .execute(BinaryOperator::Sum)
            .select(["max"])
            .execute(BinaryOperator::Max)
            .build();

        let state: Element = Edge::new("edge", "A", "B", true)
            .with_property("count", 3i64)
            .with_property("max", 1i64)
            .into();
        let input: Element = Edge::new("edge", "A", "B", true)
            .with_property("count", 5i64)
            .with_property("max", 9i64)
            .into();

        let merged = aggregator.apply(state, &input).unwrap();
        assert_eq!(merged.get_property("count"), Some(&PropertyValue::from(8i64)));
        assert_eq!(merged.get_property("max"), Some(&PropertyValue::from(9i64)));
        assert_eq!(merged.get_field("SOURCE"), PropertyValue::from("A"));
    }

    #[test]
    fn test_aggregates_properties() {
        let aggregator = ElementAggregator::builder()
            .select(["names"])
            .execute(BinaryOperator::StringConcat {
                separator: ",".into(),
            })
            .build();

        let state: Properties = vec![("names", "a")].into_iter().collect();
        let input: Properties = vec![("names", "b")].into_iter().collect();
        let merged = aggregator.apply(state, &input).unwrap();
        assert_eq!(merged.get("names"), Some(&PropertyValue::from("a,b")));
    }

    #[test]
    fn test_missing_state_value_takes_input() {
        let aggregator = ElementAggregator::builder()
            .select(["count"])
            .execute(BinaryOperator::Sum)
            .build();
        let state: Element = Edge::new("edge", "A", "B", true).into();
        let input: Element = Edge::new("edge", "A", "B", true)
            .with_property("count", 2i64)
            .into();
        let merged = aggregator.apply(state, &input).unwrap();
        assert_eq!(merged.get_property("count"), Some(&PropertyValue::from(2i64)));
        assert!(aggregator.covers("count"));
        assert!(!aggregator.covers("other"));
    }

    #[test]
    fn test_custom_operator_must_cover_selection() {
        let aggregator = ElementAggregator::builder()
            .select(["count", "max"])
            .execute(BinaryOperator::custom("Truncating", |state, _| {
                state.into_iter().take(1).collect()
            }))
            .build();
        let state: Element = Edge::new("edge", "A", "B", true)
            .with_property("count", 1i64)
            .with_property("max", 1i64)
            .into();
        let input = state.clone();

        match aggregator.apply(state, &input) {
            Err(FunctionError::Arity { expected, actual, .. }) => {
                assert_eq!((expected, actual), (2, 1))
            }
            other => panic!("expected arity error, got {:?}", other),
        }
    }
}
