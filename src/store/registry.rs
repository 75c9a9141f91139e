//! Handler registry
//!
//! Maps operation classes and families to handlers. Lookup walks the
//! operation's lineage from the most specific class to `Operation`.

use super::handler::OperationHandler;
use crate::operation::{Operation, OperationError, OperationResult};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn OperationHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        HandlerRegistry::default()
    }

    /// Register `handler` for a class or family, replacing any previous one
    pub fn register(
        &self,
        class: impl Into<String>,
        handler: Arc<dyn OperationHandler>,
    ) -> OperationResult<()> {
        let class = class.into();
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| OperationError::Internal("handler registry lock poisoned".into()))?;
        debug!(class = %class, "registering operation handler");
        handlers.insert(class, handler);
        Ok(())
    }

    /// Handler for the most specific class in the operation's lineage
    pub fn resolve(&self, operation: &dyn Operation) -> OperationResult<Arc<dyn OperationHandler>> {
        let handlers = self
            .handlers
            .read()
            .map_err(|_| OperationError::Internal("handler registry lock poisoned".into()))?;
        operation
            .lineage()
            .into_iter()
            .find_map(|class| handlers.get(class).cloned())
            .ok_or_else(|| OperationError::Unsupported(operation.class().to_string()))
    }

    pub fn is_supported(&self, operation: &dyn Operation) -> bool {
        self.resolve(operation).is_ok()
    }

    /// Registered classes and families
    pub fn classes(&self) -> Vec<String> {
        self.handlers
            .read()
            .map(|handlers| handlers.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{Count, GetAllElements, Payload, OUTPUT_FAMILY};
    use crate::store::{Context, Store};
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl OperationHandler for Named {
        async fn do_operation(
            &self,
            _operation: Box<dyn Operation>,
            _ctx: &mut Context,
            _store: &dyn Store,
        ) -> OperationResult<Payload> {
            Ok(Payload::Strings(vec![self.0.to_string()]))
        }
    }

    #[test]
    fn test_resolves_most_specific() {
        let count: Arc<dyn OperationHandler> = Arc::new(Named("count"));
        let output: Arc<dyn OperationHandler> = Arc::new(Named("output"));
        let registry = HandlerRegistry::new();
        registry.register("Count", Arc::clone(&count)).unwrap();
        registry.register(OUTPUT_FAMILY, Arc::clone(&output)).unwrap();

        let resolved = registry.resolve(&Count::new()).unwrap();
        assert!(Arc::ptr_eq(&resolved, &count));
        let resolved = registry.resolve(&GetAllElements::new()).unwrap();
        assert!(Arc::ptr_eq(&resolved, &output));
        assert_eq!(registry.classes().len(), 2);
    }

    #[test]
    fn test_unsupported() {
        let registry = HandlerRegistry::new();
        registry.register("Count", Arc::new(Named("count"))).unwrap();
        match registry.resolve(&GetAllElements::new()) {
            Err(OperationError::Unsupported(class)) => assert_eq!(class, "GetAllElements"),
            _ => panic!("expected unsupported"),
        }
        assert!(!registry.is_supported(&GetAllElements::new()));
    }
}
