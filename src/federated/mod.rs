//! Federated execution
//!
//! A [`FederatedStore`] owns a set of constituent graphs, each backed by its
//! own store. Reads and writes are planned per graph, run concurrently and
//! merged by output type.

pub mod graph;
pub mod handler;
pub mod merge;
pub mod store;

pub use graph::{ConstituentGraph, GraphAccess, GraphRegistry};
pub use handler::FederatedOperationHandler;
pub use merge::{MergeFunction, MergeFunctions};
pub use store::{FederatedStore, FEDERATED_STORE_CLASS};

/// Options key overriding the configured failure policy for one operation
pub const SKIP_FAILURES: &str = "graphweave.federated.skip_failures";
