//! Chain-scoped set exports
//!
//! Exports live in the [`crate::store::Context`] of the running chain under
//! `"SetExporter: <key>"`. Each export keeps the first occurrence of every
//! element in insertion order.

use super::payload::{Payload, PayloadType};
use super::{ElementInput, Operation, OperationResult, Options};
use std::any::Any;

/// Key used when none is given
pub const DEFAULT_EXPORT_KEY: &str = "ALL";

const SET_EXPORTER: &str = "SetExporter";

/// Context name of the set export `key`
pub fn set_export_name(key: &str) -> String {
    format!("{}: {}", SET_EXPORTER, key)
}

/// Add the input to a set export and pass it through
#[derive(Debug, Clone)]
pub struct ExportToSet {
    pub input: ElementInput,
    pub key: String,
    pub options: Options,
}

impl ExportToSet {
    pub fn new() -> Self {
        ExportToSet::with_key(DEFAULT_EXPORT_KEY)
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        ExportToSet {
            input: ElementInput::default(),
            key: key.into(),
            options: Options::new(),
        }
    }
}

impl Default for ExportToSet {
    fn default() -> Self {
        ExportToSet::new()
    }
}

impl Operation for ExportToSet {
    fn class(&self) -> &'static str {
        "ExportToSet"
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

/// Read back a slice `[start, end)` of a set export
#[derive(Debug, Clone)]
pub struct GetSetExport {
    pub key: String,
    pub start: usize,
    pub end: Option<usize>,
    pub options: Options,
}

impl GetSetExport {
    pub fn new() -> Self {
        GetSetExport::with_key(DEFAULT_EXPORT_KEY)
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        GetSetExport {
            key: key.into(),
            start: 0,
            end: None,
            options: Options::new(),
        }
    }

    pub fn with_range(mut self, start: usize, end: Option<usize>) -> Self {
        self.start = start;
        self.end = end;
        self
    }
}

impl Default for GetSetExport {
    fn default() -> Self {
        GetSetExport::new()
    }
}

impl Operation for GetSetExport {
    fn class(&self) -> &'static str {
        "GetSetExport"
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
        PayloadType::Elements
    }

    /// Any previous output is discarded
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

/// Read several exports at once, keyed by export name
#[derive(Debug, Clone, Default)]
pub struct GetExports {
    pub exports: Vec<GetSetExport>,
    pub options: Options,
}

impl GetExports {
    pub fn new(exports: Vec<GetSetExport>) -> Self {
        GetExports {
            exports,
            options: Options::new(),
        }
    }
}

impl Operation for GetExports {
    fn class(&self) -> &'static str {
        "GetExports"
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
        PayloadType::Exports
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
