//! Operations that reshape or summarise an element stream

use super::payload::{Payload, PayloadType};
use super::{ElementInput, Operation, OperationResult, Options};
use std::any::Any;

/// Number of elements in the input
#[derive(Debug, Clone, Default)]
pub struct Count {
    pub input: ElementInput,
    pub options: Options,
}

impl Count {
    pub fn new() -> Self {
        Count::default()
    }
}

impl Operation for Count {
    fn class(&self) -> &'static str {
        "Count"
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
        PayloadType::Count
    }

    fn set_input(&mut self, input: Payload) -> OperationResult<()> {
        match input {
            Payload::Elements(stream) => {
                self.input = ElementInput::new(stream);
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

/// Number of elements per group
///
/// With a limit, counting stops once that many elements have been seen and
/// the result is flagged.
#[derive(Debug, Clone, Default)]
pub struct CountGroups {
    pub input: ElementInput,
    pub limit: Option<usize>,
    pub options: Options,
}

impl CountGroups {
    pub fn new() -> Self {
        CountGroups::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl Operation for CountGroups {
    fn class(&self) -> &'static str {
        "CountGroups"
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
        PayloadType::GroupCounts
    }

    fn set_input(&mut self, input: Payload) -> OperationResult<()> {
        match input {
            Payload::Elements(stream) => {
                self.input = ElementInput::new(stream);
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

/// First `result_limit` elements of the input
///
/// When `truncate` is false, more input than the limit is an error.
#[derive(Debug, Clone, Default)]
pub struct Limit {
    pub input: ElementInput,
    pub result_limit: usize,
    pub truncate: bool,
    pub options: Options,
}

impl Limit {
    pub fn new(result_limit: usize) -> Self {
        Limit {
            result_limit,
            truncate: true,
            ..Default::default()
        }
    }

    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }
}

impl Operation for Limit {
    fn class(&self) -> &'static str {
        "Limit"
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
        PayloadType::Elements
    }

    fn set_input(&mut self, input: Payload) -> OperationResult<()> {
        match input {
            Payload::Elements(stream) => {
                self.input = ElementInput::new(stream);
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

/// Drops whatever it is given
#[derive(Debug, Clone, Default)]
pub struct DiscardOutput {
    pub options: Options,
}

impl DiscardOutput {
    pub fn new() -> Self {
        DiscardOutput::default()
    }
}

impl Operation for DiscardOutput {
    fn class(&self) -> &'static str {
        "DiscardOutput"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn input_type(&self) -> PayloadType {
        PayloadType::Any
    }

    fn output_type(&self) -> PayloadType {
        PayloadType::Empty
    }

    fn set_input(&mut self, _input: Payload) -> OperationResult<()> {
        Ok(())
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
