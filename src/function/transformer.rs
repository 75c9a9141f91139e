//! Element transformers
//!
//! Built with a select, execute, project state machine. Calling `project`
//! straight after `select` binds the identity function; leaving out `project`
//! projects back onto the selection.

use super::adapted::{to_names, TupleAdapted};
use super::function::Function;
use super::{expect_outputs, FunctionError, FunctionResult};
use crate::element::Tuple;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementTransformer {
    pub components: Vec<TupleAdapted<Function>>,
}

impl ElementTransformer {
    pub fn builder() -> TransformerBuilder {
        TransformerBuilder {
            transformer: ElementTransformer::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Apply every component in order, writing results into the tuple
    pub fn apply<T: Tuple>(&self, tuple: &mut T) -> FunctionResult<()> {
        for component in &self.components {
            let values = tuple.select(&component.selection);
            let results = component.function.apply(values)?;
            let projection = component.effective_projection();
            expect_outputs(component.function.name(), projection, &results)?;
            tuple.project(projection, results);
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

    /// Fields written by any component
    pub fn projected_fields(&self) -> impl Iterator<Item = &String> {
        self.components
            .iter()
            .flat_map(|c| c.effective_projection().iter())
    }
}

/// Builder accepting the next selection
pub struct TransformerBuilder {
    transformer: ElementTransformer,
}

impl TransformerBuilder {
    pub fn select<I, S>(self, selection: I) -> SelectedTransformerBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectedTransformerBuilder {
            transformer: self.transformer,
            selection: to_names(selection),
        }
    }

    pub fn build(self) -> ElementTransformer {
        self.transformer
    }
}

/// Builder holding a selection
pub struct SelectedTransformerBuilder {
    transformer: ElementTransformer,
    selection: Vec<String>,
}

impl SelectedTransformerBuilder {
    pub fn execute(self, function: Function) -> ExecutedTransformerBuilder {
        ExecutedTransformerBuilder {
            transformer: self.transformer,
            current: TupleAdapted::new(self.selection, function),
        }
    }

    /// Copy the selection to the projection unchanged
    pub fn project<I, S>(self, projection: I) -> TransformerBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.execute(Function::Identity).project(projection)
    }
}

/// Builder holding a selection and its function
pub struct ExecutedTransformerBuilder {
    transformer: ElementTransformer,
    current: TupleAdapted<Function>,
}

impl ExecutedTransformerBuilder {
    pub fn project<I, S>(mut self, projection: I) -> TransformerBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.current.projection = to_names(projection);
        self.transformer.components.push(self.current);
        TransformerBuilder {
            transformer: self.transformer,
        }
    }

    pub fn select<I, S>(self, selection: I) -> SelectedTransformerBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.finish().select(selection)
    }

    pub fn build(self) -> ElementTransformer {
        self.finish().build()
    }

    fn finish(mut self) -> TransformerBuilder {
        self.current.projection = self.current.selection.clone();
        self.transformer.components.push(self.current);
        TransformerBuilder {
            transformer: self.transformer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, Entity, PropertyValue};

    #[test]
    fn test_identity_projection_to_new_field() {
        let transformer = ElementTransformer::builder()
            .select(["prop1"])
            .execute(Function::Identity)
            .project(["prop3"])
            .build();

        let mut element: Element = Entity::new("entity", "v")
            .with_property("prop1", "value")
            .into();
        transformer.apply(&mut element).unwrap();

        assert_eq!(element.get_property("prop3"), Some(&PropertyValue::from("value")));
        assert_eq!(element.get_property("prop1"), Some(&PropertyValue::from("value")));
    }

    #[test]
    fn test_project_without_execute_uses_identity() {
        let transformer = ElementTransformer::builder()
            .select(["a"])
            .project(["b"])
            .build();
        assert_eq!(transformer.components[0].function, Function::Identity);
    }

    #[test]
    fn test_missing_project_defaults_to_selection() {
        let transformer = ElementTransformer::builder()
            .select(["count"])
            .execute(Function::ToString)
            .select(["name"])
            .execute(Function::Length)
            .build();

        assert_eq!(transformer.components.len(), 2);
        assert_eq!(transformer.components[0].projection, vec!["count".to_string()]);

        let mut element: Element = Entity::new("entity", "v")
            .with_property("count", 7i64)
            .with_property("name", "alice")
            .into();
        transformer.apply(&mut element).unwrap();
        assert_eq!(element.get_property("count"), Some(&PropertyValue::from("7")));
        assert_eq!(element.get_property("name"), Some(&PropertyValue::from(5i64)));
    }

    #[test]
    fn test_later_components_see_earlier_writes() {
        let transformer = ElementTransformer::builder()
            .select(["VERTEX"])
            .execute(Function::Identity)
            .project(["copy"])
            .select(["copy"])
            .execute(Function::Length)
            .project(["copy_length"])
            .build();

        let mut element: Element = Entity::new("entity", "abcd").into();
        transformer.apply(&mut element).unwrap();
        assert_eq!(element.get_property("copy_length"), Some(&PropertyValue::from(4i64)));
    }

    #[test]
    fn test_short_result_is_an_arity_error() {
        let transformer = ElementTransformer::builder()
            .select(["a"])
            .execute(Function::custom("FirstOnly", |values| values.into_iter().take(1).collect()))
            .project(["x", "y"])
            .build();

        let mut element: Element = Entity::new("entity", "v").with_property("a", 1i64).into();
        let result = transformer.apply(&mut element);
        assert_eq!(
            result,
            Err(FunctionError::Arity {
                function: "FirstOnly".to_string(),
                expected: 2,
                actual: 1,
            })
        );
        assert_eq!(element.get_property("x"), None);
    }
}
