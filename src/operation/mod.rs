//! Operations
//!
//! An operation is a self-describing request with an optional typed input,
//! a declared output shape, an options map and, for reads, a view. Stores
//! resolve each operation to a handler through its lineage, most specific
//! class first. Chains feed the output of one step into the next.

pub mod add;
pub mod chain;
pub mod export;
pub mod for_each;
pub mod function;
pub mod get;
pub mod graph;
pub mod output;
pub mod payload;
pub mod stream;

pub use add::AddElements;
pub use chain::OperationChain;
pub use export::{ExportToSet, GetExports, GetSetExport};
pub use for_each::{ForEach, ForEachItem};
pub use function::{Aggregate, AggregatePair, Filter, Transform};
pub use get::{DirectedType, GetAllElements, GetElements, IncludeIncomingOutgoing, SeedMatching};
pub use graph::{AddGraph, GetAllGraphIds, GetSchema, RemoveGraph};
pub use output::{Count, CountGroups, DiscardOutput, Limit};
pub use payload::{GroupCounts, Payload, PayloadType};
pub use stream::{CloseError, ElementStream};

use crate::aggregation::AggregationError;
use crate::config::ConfigError;
use crate::function::FunctionError;
use crate::library::LibraryError;
use crate::schema::SchemaError;
use crate::view::{View, ViewError};
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Options key restricting federation to a comma separated list of graph ids
pub const FEDERATED_GRAPH_IDS: &str = "graphweave.federated.graph_ids";

/// Family shared by the element reads
pub const GET_FAMILY: &str = "Get";
/// Family of every operation with an output
pub const OUTPUT_FAMILY: &str = "Output";
/// Root of every lineage
pub const OPERATION_FAMILY: &str = "Operation";

/// Backend-specific hints
pub type Options = IndexMap<String, String>;

/// Operation errors
#[derive(Error, Debug, Clone)]
pub enum OperationError {
    /// No handler is registered for any class in the lineage
    #[error("Operation {0} is not supported by this store")]
    Unsupported(String),

    /// Input of the wrong shape
    #[error("{operation} expects {expected} input but received {actual}")]
    InvalidInput {
        operation: String,
        expected: PayloadType,
        actual: PayloadType,
    },

    /// Adjacent chain steps have incompatible shapes
    #[error("Step {step} ({operation}) expects {expected} input but the previous step outputs {actual}")]
    IncompatibleChain {
        step: usize,
        operation: String,
        expected: PayloadType,
        actual: PayloadType,
    },

    /// Input was required but never set, or already consumed
    #[error("{0} has no input")]
    MissingInput(String),

    /// A chain step failed; later steps were not run
    #[error("Step {step} ({operation}) failed: {source}")]
    ChainStep {
        step: usize,
        operation: String,
        #[source]
        source: Box<OperationError>,
    },

    /// A constituent graph failed
    #[error("Graph '{graph_id}' failed: {source}")]
    Graph {
        graph_id: String,
        #[source]
        source: Box<OperationError>,
    },

    /// Every constituent graph failed under skip-failures
    #[error("{} graph(s) failed: {}", .0.len(), describe_failures(.0))]
    PartialFailure(Vec<GraphFailure>),

    /// Result count exceeded a limit that does not truncate
    #[error("Limit of {0} exceeded")]
    LimitExceeded(usize),

    #[error("Graph '{0}' was not found")]
    GraphNotFound(String),

    #[error("Graph '{0}' already exists")]
    GraphAlreadyExists(String),

    #[error("User '{0}' is not authorised for this operation")]
    Unauthorised(String),

    /// Backend failure
    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("View error: {0}")]
    View(#[from] ViewError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Function error: {0}")]
    Function(#[from] FunctionError),

    #[error("Graph library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<CloseError> for OperationError {
    fn from(error: CloseError) -> Self {
        OperationError::Store(error.to_string())
    }
}

pub type OperationResult<T> = Result<T, OperationError>;

/// Failure of one constituent graph
#[derive(Debug, Clone)]
pub struct GraphFailure {
    pub graph_id: String,
    pub error: OperationError,
}

impl fmt::Display for GraphFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.graph_id, self.error)
    }
}

fn describe_failures(failures: &[GraphFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A request executed by a store
pub trait Operation: Send + Sync + fmt::Debug {
    /// Stable type tag
    fn class(&self) -> &'static str;

    /// Classes used for handler lookup, most specific first
    fn lineage(&self) -> Vec<&'static str> {
        let mut lineage = vec![self.class()];
        if self.output_type() != PayloadType::Empty {
            lineage.push(OUTPUT_FAMILY);
        }
        lineage.push(OPERATION_FAMILY);
        lineage
    }

    fn options(&self) -> &Options;

    fn options_mut(&mut self) -> &mut Options;

    fn option(&self, key: &str) -> Option<&str> {
        self.options().get(key).map(String::as_str)
    }

    fn input_type(&self) -> PayloadType {
        PayloadType::Empty
    }

    fn output_type(&self) -> PayloadType;

    /// Whether a previous step's output of shape `output` can be fed in.
    /// Operations without an input ignore the previous output.
    fn accepts_input(&self, output: PayloadType) -> bool {
        let input = self.input_type();
        input == PayloadType::Empty || output == PayloadType::Empty || output.feeds(input)
    }

    /// Replace the input. Shapes other than [`Operation::input_type`] are rejected.
    fn set_input(&mut self, input: Payload) -> OperationResult<()> {
        match input {
            Payload::Empty => Ok(()),
            other => Err(self.invalid_input(&other)),
        }
    }

    fn view(&self) -> Option<&View> {
        None
    }

    /// Ignored by operations without a view
    fn set_view(&mut self, _view: View) {}

    /// Independent copy sharing the same input
    fn shallow_clone(&self) -> Box<dyn Operation>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;

    fn invalid_input(&self, input: &Payload) -> OperationError {
        OperationError::InvalidInput {
            operation: self.class().to_string(),
            expected: self.input_type(),
            actual: input.payload_type(),
        }
    }
}

/// Recover the concrete operation behind a trait object
pub fn downcast<T: Operation + 'static>(operation: Box<dyn Operation>) -> OperationResult<Box<T>> {
    let class = operation.class();
    operation
        .into_any()
        .downcast::<T>()
        .map_err(|_| OperationError::Internal(format!("handler received unexpected operation {}", class)))
}

/// Graph ids listed in the federation option, if any
pub fn federated_graph_ids(operation: &dyn Operation) -> Option<Vec<String>> {
    operation.option(FEDERATED_GRAPH_IDS).map(|ids| {
        ids.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect()
    })
}

/// Element stream input shared between shallow clones and consumed once
#[derive(Debug, Clone, Default)]
pub struct ElementInput(Arc<Mutex<Option<ElementStream>>>);

impl ElementInput {
    pub fn new(stream: ElementStream) -> Self {
        ElementInput(Arc::new(Mutex::new(Some(stream))))
    }

    pub fn is_set(&self) -> bool {
        self.0.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Take the stream; later calls see no input
    pub fn take(&self, operation: &str) -> OperationResult<ElementStream> {
        let mut slot = self
            .0
            .lock()
            .map_err(|_| OperationError::Internal("operation input lock poisoned".into()))?;
        slot.take()
            .ok_or_else(|| OperationError::MissingInput(operation.to_string()))
    }
}

impl From<Vec<crate::element::Element>> for ElementInput {
    fn from(elements: Vec<crate::element::Element>) -> Self {
        ElementInput::new(ElementStream::from_vec(elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, Entity};

    #[test]
    fn test_lineage_ends_with_families() {
        let count = Count::new();
        assert_eq!(count.lineage(), vec!["Count", OUTPUT_FAMILY, OPERATION_FAMILY]);
        let add = AddElements::new(Vec::new());
        assert_eq!(add.lineage(), vec!["AddElements", OPERATION_FAMILY]);
        let get = GetAllElements::new();
        assert_eq!(
            get.lineage(),
            vec!["GetAllElements", GET_FAMILY, OUTPUT_FAMILY, OPERATION_FAMILY]
        );
    }

    #[test]
    fn test_downcast() {
        let op: Box<dyn Operation> = Box::new(Limit::new(3));
        let limit = downcast::<Limit>(op).unwrap();
        assert_eq!(limit.result_limit, 3);

        let op: Box<dyn Operation> = Box::new(Count::new());
        assert!(matches!(downcast::<Limit>(op), Err(OperationError::Internal(_))));
    }

    #[test]
    fn test_federated_graph_ids_option() {
        let mut op = Count::new();
        assert!(federated_graph_ids(&op).is_none());
        op.options_mut()
            .insert(FEDERATED_GRAPH_IDS.into(), "a, b,,c".into());
        assert_eq!(federated_graph_ids(&op).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_element_input_is_consumed_once() {
        let element: Element = Entity::new("g", "v").into();
        let input = ElementInput::from(vec![element.clone()]);
        let shared = input.clone();
        assert!(shared.is_set());
        let stream = input.take("Count").unwrap();
        assert_eq!(stream.collect_all().unwrap(), vec![element]);
        assert!(matches!(shared.take("Count"), Err(OperationError::MissingInput(_))));
    }

    #[test]
    fn test_partial_failure_message() {
        let error = OperationError::PartialFailure(vec![GraphFailure {
            graph_id: "broken".into(),
            error: OperationError::Store("offline".into()),
        }]);
        assert_eq!(error.to_string(), "1 graph(s) failed: broken: Store error: offline");
    }
}
