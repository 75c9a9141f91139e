use super::payload::{Payload, PayloadType};
use super::{Operation, OperationResult, Options};
use crate::element::Element;
use std::any::Any;
use std::sync::Arc;

/// Write elements to a graph
///
/// With `validate` set, each element is checked against the schema first.
/// Invalid elements fail the operation unless `skip_invalid_elements` is set,
/// in which case they are dropped.
#[derive(Debug, Clone)]
pub struct AddElements {
    pub input: Arc<Vec<Element>>,
    pub validate: bool,
    pub skip_invalid_elements: bool,
    pub options: Options,
}

impl AddElements {
    pub fn new(elements: Vec<Element>) -> Self {
        AddElements {
            input: Arc::new(elements),
            validate: true,
            skip_invalid_elements: false,
            options: Options::new(),
        }
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_skip_invalid_elements(mut self, skip: bool) -> Self {
        self.skip_invalid_elements = skip;
        self
    }
}

impl Default for AddElements {
    fn default() -> Self {
        AddElements::new(Vec::new())
    }
}

impl Operation for AddElements {
    fn class(&self) -> &'static str {
        "AddElements"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn input_type(&self) -> PayloadType {
        PayloadType::Elements
    }

    fn output_type(&self) -> PayloadType {
        PayloadType::Empty
    }

    fn set_input(&mut self, input: Payload) -> OperationResult<()> {
        match input {
            Payload::Elements(stream) => {
                self.input = Arc::new(stream.collect_all()?);
                Ok(())
            }
            other => Err(self.invalid_input(&other)),
        }
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
