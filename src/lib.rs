//! Graphweave
//!
//! A storage-agnostic graph query engine. Elements (entities and edges) are
//! described by a schema, read through views, reduced by schema-driven
//! aggregation and manipulated by operations dispatched to pluggable stores.
//! A federated store fans operations out to several constituent graphs and
//! merges their results.
//!
//! # Layout
//!
//! - [`element`]: entities, edges, property values and seeds
//! - [`function`]: filters, transformers and aggregators (select, execute, project)
//! - [`schema`] and [`view`]: ingest and query time element definitions
//! - [`aggregation`]: ingest and query aggregation
//! - [`operation`]: operations, chains and payloads
//! - [`store`]: handler registry, context and the in-memory store
//! - [`federated`]: fan-out across constituent graphs
//! - [`library`]: shared graph definitions
//! - [`config`]: engine configuration
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use graphweave::element::Edge;
//! use graphweave::function::BinaryOperator;
//! use graphweave::operation::{AddElements, Count, GetAllElements, OperationChain};
//! use graphweave::schema::{Schema, SchemaElementDefinition, TypeDefinition};
//! use graphweave::store::{Context, MemoryStore, Store, StoreProperties};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::builder()
//!     .type_def("string", TypeDefinition::new("String"))
//!     .type_def("count", TypeDefinition::new("Integer").with_aggregate_function(BinaryOperator::Sum))
//!     .edge("edge", SchemaElementDefinition::edge("string", "string").property("count", "count"))
//!     .build()?;
//! let store = MemoryStore::new("graph", schema, StoreProperties::memory())?;
//!
//! let chain = OperationChain::new(vec![
//!     Box::new(AddElements::new(vec![Edge::new("edge", "A", "B", true).with_property("count", 3i64).into()])),
//!     Box::new(GetAllElements::new()),
//!     Box::new(Count::new()),
//! ])?;
//! let mut ctx = Context::default();
//! let count = store.execute(Box::new(chain), &mut ctx).await?;
//! assert_eq!(count.as_count(), Some(1));
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod aggregation;
pub mod config;
pub mod element;
pub mod federated;
pub mod function;
pub mod library;
pub mod operation;
pub mod schema;
pub mod store;
pub mod view;

// Re-export main types for convenience
pub use aggregation::{ingest_aggregate, query_aggregate, AggregationError, AggregationResult};

pub use config::{ConfigError, ConfigResult, EngineConfig, FailurePolicy, FederatedConfig};

pub use element::{Edge, Element, ElementSeed, Entity, PropertyValue};

pub use federated::{FederatedStore, GraphAccess, MergeFunctions};

pub use library::{GraphLibrary, HashMapGraphLibrary, LibraryError, LibraryResult};

pub use operation::{
    ElementStream, Operation, OperationChain, OperationError, OperationResult, Payload,
    PayloadType,
};

pub use schema::{Schema, SchemaError, SchemaResult};

pub use store::{Context, MemoryStore, Store, StoreProperties, User};

pub use view::{View, ViewError, ViewResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.1.0");
    }
}
