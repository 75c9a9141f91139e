//! Element filters
//!
//! A filter holds when every component's predicate holds. Evaluation stops
//! at the first failing component and never mutates the element.

use super::adapted::{to_names, TupleAdapted};
use super::predicate::Predicate;
use super::{FunctionError, FunctionResult};
use crate::element::Tuple;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementFilter {
    pub components: Vec<TupleAdapted<Predicate>>,
}

impl ElementFilter {
    pub fn builder() -> FilterBuilder {
        FilterBuilder {
            filter: ElementFilter::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Test the tuple against every component in order
    pub fn test<T: Tuple>(&self, tuple: &T) -> FunctionResult<bool> {
        for component in &self.components {
            let values = tuple.select(&component.selection);
            if !component.function.test(&values)? {
                return Ok(false);
            }
        }
        Ok(true)
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

    /// Fields read by any component
    pub fn selected_fields(&self) -> impl Iterator<Item = &String> {
        self.components.iter().flat_map(|c| c.selection.iter())
    }
}

/// Builder accepting the next selection
pub struct FilterBuilder {
    filter: ElementFilter,
}

impl FilterBuilder {
    pub fn select<I, S>(self, selection: I) -> SelectedFilterBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectedFilterBuilder {
            filter: self.filter,
            selection: to_names(selection),
        }
    }

    pub fn build(self) -> ElementFilter {
        self.filter
    }
}

/// Builder holding a selection and waiting for its predicate
pub struct SelectedFilterBuilder {
    filter: ElementFilter,
    selection: Vec<String>,
}

impl SelectedFilterBuilder {
    pub fn execute(mut self, predicate: Predicate) -> FilterBuilder {
        self.filter
            .components
            .push(TupleAdapted::new(self.selection, predicate));
        FilterBuilder {
            filter: self.filter,
        }
    }
}
