//! Function pipeline
//!
//! Filters, transformers and aggregators are composites of tuple-adapted
//! components. Each component reads its `selection` fields off an element,
//! applies a predicate, function or binary operator, and (for transformers and
//! aggregators) writes the result back to its `projection` fields. Components
//! run strictly in the order they were added.

pub mod adapted;
pub mod aggregator;
pub mod binary;
pub mod filter;
pub mod function;
pub mod predicate;
pub mod transformer;

pub use adapted::TupleAdapted;
pub use aggregator::ElementAggregator;
pub use binary::BinaryOperator;
pub use filter::ElementFilter;
pub use function::Function;
pub use predicate::Predicate;
pub use transformer::ElementTransformer;

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while applying pipeline functions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctionError {
    /// Wrong number of selected values for a function
    #[error("{function} expects {expected} input value(s) but received {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// Value of an unsupported type
    #[error("{function} cannot be applied to {found}")]
    TypeMismatch { function: String, found: String },

    /// Function-specific failure
    #[error("{function} failed: {message}")]
    Apply { function: String, message: String },

    /// A component selected no fields
    #[error("{0} component must select at least one field")]
    EmptySelection(String),
}

pub type FunctionResult<T> = Result<T, FunctionError>;

/// A runtime-registered function identified by name
///
/// Two customs are equal when they share a name and point at the same closure.
pub struct Custom<F: ?Sized> {
    name: String,
    func: Arc<F>,
}

impl<F: ?Sized> Custom<F> {
    pub fn new(name: impl Into<String>, func: Arc<F>) -> Self {
        Custom {
            name: name.into(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn func(&self) -> &F {
        &self.func
    }
}

impl<F: ?Sized> Clone for Custom<F> {
    fn clone(&self) -> Self {
        Custom {
            name: self.name.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<F: ?Sized> PartialEq for Custom<F> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.func, &other.func)
    }
}

impl<F: ?Sized> fmt::Debug for Custom<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Custom({})", self.name)
    }
}

/// Results must line up one-to-one with the fields they are written to
pub(crate) fn expect_outputs<T>(function: &str, fields: &[String], values: &[T]) -> FunctionResult<()> {
    if values.len() == fields.len() {
        return Ok(());
    }
    Err(FunctionError::Arity {
        function: function.to_string(),
        expected: fields.len(),
        actual: values.len(),
    })
}

pub(crate) fn expect_single<T: Clone>(
    function: &str,
    values: &[T],
) -> FunctionResult<T> {
    match values {
        [value] => Ok(value.clone()),
        _ => Err(FunctionError::Arity {
            function: function.to_string(),
            expected: 1,
            actual: values.len(),
        }),
    }
}
