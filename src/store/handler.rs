//! Operation handlers
//!
//! Handlers here only touch their input, the context and the store schema,
//! so every store registers them. Backend reads and writes are registered by
//! each store.

use super::context::Context;
use super::registry::HandlerRegistry;
use super::Store;
use crate::element::Element;
use crate::operation::export::set_export_name;
use crate::operation::{
    downcast, Aggregate, Count, CountGroups, ExportToSet, Filter, ForEach, GetExports,
    GetSetExport, GroupCounts, Limit, Operation, OperationChain, OperationError, OperationResult,
    Payload, Transform,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Executes one kind of operation against a store
#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        ctx: &mut Context,
        store: &dyn Store,
    ) -> OperationResult<Payload>;
}

/// Runs chain steps in order through the store
pub struct OperationChainHandler;

#[async_trait]
impl OperationHandler for OperationChainHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        ctx: &mut Context,
        store: &dyn Store,
    ) -> OperationResult<Payload> {
        let chain = downcast::<OperationChain>(operation)?;
        let mut previous = Payload::Empty;
        for (step, mut operation) in chain.into_steps().into_iter().enumerate() {
            let class = operation.class();
            let result = match OperationChain::connect(step, operation.as_mut(), previous) {
                Ok(()) => {
                    debug!(step, operation = class, "executing chain step");
                    store.execute(operation, ctx).await
                }
                Err(e) => Err(e),
            };
            previous = result.map_err(|source| {
                warn!(step, operation = class, error = %source, "chain step failed");
                OperationError::ChainStep {
                    step,
                    operation: class.to_string(),
                    source: Box::new(source),
                }
            })?;
        }
        Ok(previous)
    }
}

pub struct CountHandler;

#[async_trait]
impl OperationHandler for CountHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        _ctx: &mut Context,
        _store: &dyn Store,
    ) -> OperationResult<Payload> {
        let count = downcast::<Count>(operation)?;
        let mut stream = count.input.take(count.class())?;
        let total = stream.by_ref().count() as u64;
        stream.close()?;
        Ok(Payload::Count(total))
    }
}

pub struct CountGroupsHandler;

#[async_trait]
impl OperationHandler for CountGroupsHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        _ctx: &mut Context,
        _store: &dyn Store,
    ) -> OperationResult<Payload> {
        let count_groups = downcast::<CountGroups>(operation)?;
        let mut stream = count_groups.input.take(count_groups.class())?;
        let mut counts = GroupCounts::default();
        let mut seen = 0usize;
        for element in stream.by_ref() {
            if count_groups.limit.map_or(false, |limit| seen >= limit) {
                counts.limit_hit = true;
                break;
            }
            counts.increment(element.group());
            seen += 1;
        }
        stream.close()?;
        Ok(Payload::GroupCounts(counts))
    }
}

pub struct LimitHandler;

#[async_trait]
impl OperationHandler for LimitHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        _ctx: &mut Context,
        _store: &dyn Store,
    ) -> OperationResult<Payload> {
        let limit = downcast::<Limit>(operation)?;
        let mut stream = limit.input.take(limit.class())?;
        let kept: Vec<_> = stream.by_ref().take(limit.result_limit).collect();
        let exceeded = stream.next().is_some();
        stream.close()?;
        if exceeded && !limit.truncate {
            return Err(OperationError::LimitExceeded(limit.result_limit));
        }
        Ok(Payload::from(kept))
    }
}

pub struct DiscardOutputHandler;

#[async_trait]
impl OperationHandler for DiscardOutputHandler {
    async fn do_operation(
        &self,
        _operation: Box<dyn Operation>,
        _ctx: &mut Context,
        _store: &dyn Store,
    ) -> OperationResult<Payload> {
        Ok(Payload::Empty)
    }
}

pub struct FilterHandler;

#[async_trait]
impl OperationHandler for FilterHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        _ctx: &mut Context,
        _store: &dyn Store,
    ) -> OperationResult<Payload> {
        let filter = downcast::<Filter>(operation)?;
        let elements = filter.input.take(filter.class())?.collect_all()?;
        let mut kept = Vec::with_capacity(elements.len());
        for element in elements {
            if filter.test(&element)? {
                kept.push(element);
            }
        }
        Ok(Payload::from(kept))
    }
}

pub struct TransformHandler;

#[async_trait]
impl OperationHandler for TransformHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        _ctx: &mut Context,
        _store: &dyn Store,
    ) -> OperationResult<Payload> {
        let transform = downcast::<Transform>(operation)?;
        let mut elements = transform.input.take(transform.class())?.collect_all()?;
        for element in &mut elements {
            transform.apply(element)?;
        }
        Ok(Payload::from(elements))
    }
}

/// Aggregates against the schema of the executing store
pub struct AggregateHandler;

#[async_trait]
impl OperationHandler for AggregateHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        _ctx: &mut Context,
        store: &dyn Store,
    ) -> OperationResult<Payload> {
        let aggregate = downcast::<Aggregate>(operation)?;
        let elements = aggregate.input.take(aggregate.class())?.collect_all()?;
        let schema = store.schema();
        Ok(Payload::from(aggregate.apply(elements, &schema)?))
    }
}

pub struct ExportToSetHandler;

#[async_trait]
impl OperationHandler for ExportToSetHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        ctx: &mut Context,
        _store: &dyn Store,
    ) -> OperationResult<Payload> {
        let export = downcast::<ExportToSet>(operation)?;
        let elements = export.input.take(export.class())?.collect_all()?;
        ctx.add_export(&set_export_name(&export.key), elements.iter().cloned());
        Ok(Payload::from(elements))
    }
}

fn read_set_export(ctx: &Context, export: &GetSetExport) -> Vec<Element> {
    let end = export.end;
    ctx.export(&set_export_name(&export.key))
        .map(|set| {
            set.iter()
                .skip(export.start)
                .take(end.map_or(usize::MAX, |end| end.saturating_sub(export.start)))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

pub struct GetSetExportHandler;

#[async_trait]
impl OperationHandler for GetSetExportHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        ctx: &mut Context,
        _store: &dyn Store,
    ) -> OperationResult<Payload> {
        let export = downcast::<GetSetExport>(operation)?;
        Ok(Payload::from(read_set_export(ctx, &export)))
    }
}

pub struct GetExportsHandler;

#[async_trait]
impl OperationHandler for GetExportsHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        ctx: &mut Context,
        _store: &dyn Store,
    ) -> OperationResult<Payload> {
        let exports = downcast::<GetExports>(operation)?;
        let mut results = IndexMap::new();
        for export in &exports.exports {
            results.insert(set_export_name(&export.key), read_set_export(ctx, export));
        }
        Ok(Payload::Exports(results))
    }
}

/// Runs the delegate once per input item, in order
pub struct ForEachHandler;

#[async_trait]
impl OperationHandler for ForEachHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        ctx: &mut Context,
        store: &dyn Store,
    ) -> OperationResult<Payload> {
        let for_each = downcast::<ForEach>(operation)?;
        let mut outputs = Vec::with_capacity(for_each.input.len());
        for item in for_each.input.iter() {
            let delegate = for_each.delegate_for(item)?;
            let output = match store.execute(delegate, ctx).await? {
                Payload::Elements(stream) => Payload::from(stream.collect_all()?),
                other => other,
            };
            outputs.push(output);
        }
        Ok(Payload::List(outputs))
    }
}

/// Schema of the executing store
pub struct GetSchemaHandler;

#[async_trait]
impl OperationHandler for GetSchemaHandler {
    async fn do_operation(
        &self,
        _operation: Box<dyn Operation>,
        _ctx: &mut Context,
        store: &dyn Store,
    ) -> OperationResult<Payload> {
        Ok(Payload::Schema(store.schema().as_ref().clone()))
    }
}

/// Register the handlers every store supports
pub fn register_core_handlers(registry: &HandlerRegistry) -> OperationResult<()> {
    let handlers: Vec<(&str, Arc<dyn OperationHandler>)> = vec![
        ("OperationChain", Arc::new(OperationChainHandler)),
        ("Count", Arc::new(CountHandler)),
        ("CountGroups", Arc::new(CountGroupsHandler)),
        ("Limit", Arc::new(LimitHandler)),
        ("DiscardOutput", Arc::new(DiscardOutputHandler)),
        ("Filter", Arc::new(FilterHandler)),
        ("Transform", Arc::new(TransformHandler)),
        ("Aggregate", Arc::new(AggregateHandler)),
        ("ExportToSet", Arc::new(ExportToSetHandler)),
        ("GetSetExport", Arc::new(GetSetExportHandler)),
        ("GetExports", Arc::new(GetExportsHandler)),
        ("ForEach", Arc::new(ForEachHandler)),
        ("GetSchema", Arc::new(GetSchemaHandler)),
    ];
    for (class, handler) in handlers {
        registry.register(class, handler)?;
    }
    Ok(())
}

/// Materialise an element payload, closing its stream
pub fn collect_elements(payload: Payload) -> OperationResult<Vec<Element>> {
    match payload {
        Payload::Elements(stream) => Ok(stream.collect_all()?),
        Payload::Empty => Ok(Vec::new()),
        other => Err(OperationError::Internal(format!(
            "expected elements, found {}",
            other.payload_type()
        ))),
    }
}
