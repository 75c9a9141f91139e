//! In-memory store
//!
//! Elements are kept fully aggregated: every add merges the new elements
//! into the existing ones with the schema's ingest aggregation. Reads apply
//! the request view and hide elements whose visibility label the user lacks.

use super::context::{Context, User};
use super::handler::{register_core_handlers, OperationHandler};
use super::properties::StoreProperties;
use super::registry::HandlerRegistry;
use super::view_util::apply_view;
use super::{dispatch, Store};
use crate::aggregation::ingest_aggregate;
use crate::element::{Element, PropertyValue};
use crate::operation::{
    downcast, AddElements, ElementStream, GetAllElements, GetElements, Operation, OperationError,
    OperationResult, Payload,
};
use crate::schema::Schema;
use crate::view::View;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

#[derive(Default)]
struct MemoryGraph {
    elements: RwLock<Vec<Element>>,
}

impl MemoryGraph {
    fn add(&self, elements: Vec<Element>, schema: &Schema) -> OperationResult<usize> {
        let mut stored = self
            .elements
            .write()
            .map_err(|_| OperationError::Internal("memory graph lock poisoned".into()))?;
        let mut all = stored.clone();
        all.extend(elements);
        *stored = ingest_aggregate(all, schema)?;
        Ok(stored.len())
    }

    fn snapshot(&self) -> OperationResult<Vec<Element>> {
        self.elements
            .read()
            .map(|elements| elements.clone())
            .map_err(|_| OperationError::Internal("memory graph lock poisoned".into()))
    }
}

/// Whether `user` may read `element` under the schema's visibility property
fn is_visible(schema: &Schema, user: &User, element: &Element) -> bool {
    let Some(property) = schema.visibility_property() else {
        return true;
    };
    match element.get_property(property) {
        None | Some(PropertyValue::Null) => true,
        Some(PropertyValue::String(label)) if label.is_empty() => true,
        Some(PropertyValue::String(label)) => user.data_auths.contains(label.as_str()),
        Some(_) => false,
    }
}

fn read_output(
    elements: Vec<Element>,
    schema: &Schema,
    view: Option<&View>,
    user: &User,
    include_matched_vertex: bool,
    graph_id: &str,
) -> OperationResult<Payload> {
    let visible: Vec<Element> = elements
        .into_iter()
        .filter(|e| is_visible(schema, user, e))
        .collect();
    let unrestricted = View::default();
    let view = view.unwrap_or(&unrestricted);
    let output = apply_view(visible, schema, view, include_matched_vertex)?;
    Ok(Payload::Elements(ElementStream::new(graph_id.to_string(), output)))
}

struct AddElementsHandler {
    graph: Arc<MemoryGraph>,
}

#[async_trait]
impl OperationHandler for AddElementsHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        _ctx: &mut Context,
        store: &dyn Store,
    ) -> OperationResult<Payload> {
        let add = downcast::<AddElements>(operation)?;
        let schema = store.schema();
        let mut accepted = Vec::with_capacity(add.input.len());
        for element in add.input.iter() {
            if add.validate {
                if let Err(e) = schema.validate_element(element) {
                    if add.skip_invalid_elements {
                        warn!(graph_id = %store.graph_id(), error = %e, "skipping invalid element");
                        continue;
                    }
                    return Err(e.into());
                }
            }
            accepted.push(element.clone());
        }
        let added = accepted.len();
        let stored = self.graph.add(accepted, &schema)?;
        debug!(graph_id = %store.graph_id(), added, stored, "added elements");
        Ok(Payload::Empty)
    }
}

struct GetElementsHandler {
    graph: Arc<MemoryGraph>,
}

#[async_trait]
impl OperationHandler for GetElementsHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        ctx: &mut Context,
        store: &dyn Store,
    ) -> OperationResult<Payload> {
        let get = downcast::<GetElements>(operation)?;
        let stored = self.graph.snapshot()?;
        let mut matched = Vec::new();
        for seed in get.input.iter() {
            matched.extend(stored.iter().filter_map(|e| get.matches(seed, e)));
        }
        read_output(
            matched,
            &store.schema(),
            get.view.as_ref(),
            ctx.user(),
            true,
            store.graph_id(),
        )
    }
}

struct GetAllElementsHandler {
    graph: Arc<MemoryGraph>,
}

#[async_trait]
impl OperationHandler for GetAllElementsHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        ctx: &mut Context,
        store: &dyn Store,
    ) -> OperationResult<Payload> {
        let get = downcast::<GetAllElements>(operation)?;
        let elements: Vec<Element> = self
            .graph
            .snapshot()?
            .into_iter()
            .filter(|e| get.accepts(e))
            .collect();
        read_output(
            elements,
            &store.schema(),
            get.view.as_ref(),
            ctx.user(),
            false,
            store.graph_id(),
        )
    }
}

/// Reference backend holding every element in memory
pub struct MemoryStore {
    graph_id: String,
    schema: Arc<Schema>,
    properties: StoreProperties,
    registry: HandlerRegistry,
}

impl MemoryStore {
    pub fn new(
        graph_id: impl Into<String>,
        schema: Schema,
        properties: StoreProperties,
    ) -> OperationResult<Self> {
        let graph_id = graph_id.into();
        schema.validate()?;
        let graph = Arc::new(MemoryGraph::default());
        let registry = HandlerRegistry::new();
        register_core_handlers(&registry)?;
        registry.register(
            "AddElements",
            Arc::new(AddElementsHandler {
                graph: Arc::clone(&graph),
            }),
        )?;
        registry.register(
            "GetElements",
            Arc::new(GetElementsHandler {
                graph: Arc::clone(&graph),
            }),
        )?;
        registry.register("GetAllElements", Arc::new(GetAllElementsHandler { graph }))?;
        info!(graph_id = %graph_id, "initialised memory store");
        Ok(MemoryStore {
            graph_id,
            schema: Arc::new(schema),
            properties,
            registry,
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn graph_id(&self) -> &str {
        &self.graph_id
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn properties(&self) -> &StoreProperties {
        &self.properties
    }

    fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    async fn execute(
        &self,
        operation: Box<dyn Operation>,
        ctx: &mut Context,
    ) -> OperationResult<Payload> {
        dispatch(self, operation, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Edge, ElementSeed, Entity, MatchedVertex};
    use crate::function::BinaryOperator;
    use crate::operation::{Count, OperationChain};
    use crate::schema::{SchemaElementDefinition, TypeDefinition};

    fn schema() -> Schema {
        Schema::builder()
            .type_def("string", TypeDefinition::new("String"))
            .type_def(
                "count",
                TypeDefinition::new("Integer").with_aggregate_function(BinaryOperator::Sum),
            )
            .type_def(
                "visibility",
                TypeDefinition::new("String").with_aggregate_function(BinaryOperator::First),
            )
            .edge(
                "edge",
                SchemaElementDefinition::edge("string", "string")
                    .property("count", "count")
                    .property("visibility", "visibility"),
            )
            .entity(
                "entity",
                SchemaElementDefinition::entity("string").property("count", "count"),
            )
            .visibility_property("visibility")
            .build()
            .unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::new("memory", schema(), StoreProperties::memory()).unwrap()
    }

    fn edge(src: &str, dst: &str, count: i64) -> Element {
        Edge::new("edge", src, dst, true)
            .with_property("count", count)
            .into()
    }

    async fn get_all(store: &MemoryStore, ctx: &mut Context) -> Vec<Element> {
        let payload = store
            .execute(Box::new(GetAllElements::new()), ctx)
            .await
            .unwrap();
        payload.into_elements().unwrap().collect_all().unwrap()
    }

    #[tokio::test]
    async fn test_add_aggregates_on_ingest() {
        let store = store();
        let mut ctx = Context::default();
        store
            .execute(Box::new(AddElements::new(vec![edge("A", "B", 3)])), &mut ctx)
            .await
            .unwrap();
        store
            .execute(Box::new(AddElements::new(vec![edge("A", "B", 5)])), &mut ctx)
            .await
            .unwrap();
        assert_eq!(get_all(&store, &mut ctx).await, vec![edge("A", "B", 8)]);
    }

    #[tokio::test]
    async fn test_invalid_elements() {
        let store = store();
        let mut ctx = Context::default();
        let bad: Element = Entity::new("entity", "A").with_property("count", "many").into();

        let result = store
            .execute(Box::new(AddElements::new(vec![bad.clone()])), &mut ctx)
            .await;
        assert!(matches!(result, Err(OperationError::Schema(_))));

        let skip = AddElements::new(vec![bad, edge("A", "B", 1)]).with_skip_invalid_elements(true);
        store.execute(Box::new(skip), &mut ctx).await.unwrap();
        assert_eq!(get_all(&store, &mut ctx).await, vec![edge("A", "B", 1)]);
    }

    #[tokio::test]
    async fn test_get_elements_marks_matched_vertex() {
        let store = store();
        let mut ctx = Context::default();
        store
            .execute(
                Box::new(AddElements::new(vec![edge("A", "B", 1), edge("C", "A", 2)])),
                &mut ctx,
            )
            .await
            .unwrap();

        let get = GetElements::new(vec![ElementSeed::entity("A")]);
        let found = store
            .execute(Box::new(get), &mut ctx)
            .await
            .unwrap()
            .into_elements()
            .unwrap()
            .collect_all()
            .unwrap();
        let matched: Vec<Option<MatchedVertex>> = found
            .iter()
            .map(|e| e.as_edge().and_then(Edge::matched_vertex))
            .collect();
        assert_eq!(
            matched,
            vec![Some(MatchedVertex::Source), Some(MatchedVertex::Destination)]
        );
    }

    #[tokio::test]
    async fn test_visibility_hides_labelled_elements() {
        let store = store();
        let mut ctx = Context::default();
        let secret = Edge::new("edge", "A", "B", true)
            .with_property("count", 1i64)
            .with_property("visibility", "secret");
        store
            .execute(
                Box::new(AddElements::new(vec![secret.clone().into(), edge("X", "Y", 1)])),
                &mut ctx,
            )
            .await
            .unwrap();

        assert_eq!(get_all(&store, &mut ctx).await, vec![edge("X", "Y", 1)]);

        let mut cleared = Context::new(User::new("alice").with_data_auths(["secret"]));
        assert_eq!(get_all(&store, &mut cleared).await.len(), 2);
    }

    #[tokio::test]
    async fn test_chain_through_store() {
        let store = store();
        let mut ctx = Context::default();
        let chain = OperationChain::new(vec![
            Box::new(AddElements::new(vec![edge("A", "B", 1), edge("B", "C", 1)])),
            Box::new(GetAllElements::new()),
            Box::new(Count::new()),
        ])
        .unwrap();
        let payload = store.execute(Box::new(chain), &mut ctx).await.unwrap();
        assert_eq!(payload.as_count(), Some(2));
    }
}
