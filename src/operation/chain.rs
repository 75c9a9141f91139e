//! Operation chains
//!
//! Steps run strictly in order. The output of each step becomes the input of
//! the next; steps without an input drop it. Shapes are checked when the
//! chain is built and again before each step runs.

use super::payload::{Payload, PayloadType};
use super::{Operation, OperationError, OperationResult, Options};
use crate::view::View;
use std::any::Any;

#[derive(Debug)]
pub struct OperationChain {
    operations: Vec<Box<dyn Operation>>,
    pub options: Options,
}

impl OperationChain {
    /// Build a chain, rejecting adjacent steps whose shapes cannot connect
    pub fn new(operations: Vec<Box<dyn Operation>>) -> OperationResult<Self> {
        for (index, pair) in operations.windows(2).enumerate() {
            let (previous, next) = (&pair[0], &pair[1]);
            if !next.accepts_input(previous.output_type()) {
                return Err(OperationError::IncompatibleChain {
                    step: index + 1,
                    operation: next.class().to_string(),
                    expected: next.input_type(),
                    actual: previous.output_type(),
                });
            }
        }
        Ok(OperationChain {
            operations,
            options: Options::new(),
        })
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn operations(&self) -> &[Box<dyn Operation>] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Steps with the chain's options copied into each step that lacks them
    pub fn into_steps(self) -> Vec<Box<dyn Operation>> {
        let OperationChain {
            mut operations,
            options,
        } = self;
        for operation in &mut operations {
            for (key, value) in &options {
                if !operation.options().contains_key(key) {
                    operation.options_mut().insert(key.clone(), value.clone());
                }
            }
        }
        operations
    }

    /// Feed `previous` into `operation`, the runtime half of the shape check
    pub fn connect(
        step: usize,
        operation: &mut dyn Operation,
        previous: Payload,
    ) -> OperationResult<()> {
        let actual = previous.payload_type();
        if actual == PayloadType::Empty || operation.input_type() == PayloadType::Empty {
            return Ok(());
        }
        if !operation.accepts_input(actual) {
            return Err(OperationError::IncompatibleChain {
                step,
                operation: operation.class().to_string(),
                expected: operation.input_type(),
                actual,
            });
        }
        operation.set_input(previous)
    }
}

impl Clone for OperationChain {
    fn clone(&self) -> Self {
        OperationChain {
            operations: self.operations.iter().map(|op| op.shallow_clone()).collect(),
            options: self.options.clone(),
        }
    }
}

impl Operation for OperationChain {
    fn class(&self) -> &'static str {
        "OperationChain"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn input_type(&self) -> PayloadType {
        self.operations
            .first()
            .map_or(PayloadType::Empty, |op| op.input_type())
    }

    fn output_type(&self) -> PayloadType {
        self.operations
            .last()
            .map_or(PayloadType::Empty, |op| op.output_type())
    }

    fn accepts_input(&self, output: PayloadType) -> bool {
        self.operations
            .first()
            .map_or(true, |op| op.accepts_input(output))
    }

    fn set_input(&mut self, input: Payload) -> OperationResult<()> {
        match self.operations.first_mut() {
            Some(first) => first.set_input(input),
            None => Ok(()),
        }
    }

    /// View of the first step that has one
    fn view(&self) -> Option<&View> {
        self.operations.iter().find_map(|op| op.view())
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
