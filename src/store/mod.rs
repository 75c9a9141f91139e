//! Stores
//!
//! A store owns a schema and a handler registry. Executing an operation
//! resolves the handler registered for the most specific class in the
//! operation's lineage and runs it with the request context.

pub mod context;
pub mod handler;
pub mod memory;
pub mod properties;
pub mod registry;
pub mod view_util;

pub use context::{Context, User};
pub use handler::{register_core_handlers, OperationHandler};
pub use memory::MemoryStore;
pub use properties::{StoreProperties, MEMORY_STORE_CLASS, STORE_CLASS};
pub use registry::HandlerRegistry;

use crate::operation::{Operation, OperationError, OperationResult, Payload};
use crate::schema::Schema;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// A graph backend
#[async_trait]
pub trait Store: Send + Sync {
    fn graph_id(&self) -> &str;

    fn schema(&self) -> Arc<Schema>;

    fn properties(&self) -> &StoreProperties;

    fn registry(&self) -> &HandlerRegistry;

    /// Run one operation, usually by calling [`dispatch`]
    async fn execute(&self, operation: Box<dyn Operation>, ctx: &mut Context)
        -> OperationResult<Payload>;
}

/// Resolve and run the handler for `operation`
pub async fn dispatch(
    store: &dyn Store,
    operation: Box<dyn Operation>,
    ctx: &mut Context,
) -> OperationResult<Payload> {
    let handler = store.registry().resolve(operation.as_ref())?;
    debug!(
        graph_id = %store.graph_id(),
        operation = operation.class(),
        job_id = %ctx.job_id(),
        "dispatching operation"
    );
    handler.do_operation(operation, ctx, store).await
}

/// Build the store selected by `properties`
pub fn create_store(
    graph_id: &str,
    schema: Schema,
    properties: StoreProperties,
) -> OperationResult<Arc<dyn Store>> {
    match properties.store_class() {
        Some(MEMORY_STORE_CLASS) => {
            let store = MemoryStore::new(graph_id, schema, properties)?;
            info!(graph_id, store_class = MEMORY_STORE_CLASS, "created store");
            Ok(Arc::new(store))
        }
        Some(other) => Err(OperationError::Store(format!(
            "Unknown store class '{}' for graph '{}'",
            other, graph_id
        ))),
        None => Err(OperationError::Store(format!(
            "Store properties for graph '{}' have no {}",
            graph_id, STORE_CLASS
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_store_by_class() {
        let store = create_store("g", Schema::default(), StoreProperties::memory());
        assert!(store.is_ok(), "memory store should build: {:?}", store.as_ref().err());
        assert_eq!(store.unwrap().graph_id(), "g");

        let unknown = create_store("g", Schema::default(), StoreProperties::new().with(STORE_CLASS, "hbase"));
        assert!(matches!(unknown, Err(OperationError::Store(_))));
        assert!(create_store("g", Schema::default(), StoreProperties::new()).is_err());
    }
}
