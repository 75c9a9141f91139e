//! Federated operation handlers
//!
//! A federated call moves through `PLANNING`, `DISPATCHED` and `MERGING`
//! before ending `COMPLETE` or `FAILED`. Nothing is retried.

use super::graph::{ConstituentGraph, GraphAccess, GraphRegistry};
use super::merge::MergeFunctions;
use super::SKIP_FAILURES;
use crate::config::{FailurePolicy, FederatedConfig};
use crate::library::{validate_graph_id, GraphLibrary};
use crate::operation::{
    downcast, federated_graph_ids, AddElements, AddGraph, GraphFailure, Operation,
    OperationError, OperationResult, Payload, RemoveGraph, FEDERATED_GRAPH_IDS,
};
use crate::schema::Schema;
use crate::store::{create_store, Context, OperationHandler, Store, StoreProperties};
use async_trait::async_trait;
use indexmap::IndexSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Sends an operation to every eligible constituent and merges the results
pub struct FederatedOperationHandler {
    graphs: Arc<GraphRegistry>,
    merge: Arc<MergeFunctions>,
    config: FederatedConfig,
}

impl FederatedOperationHandler {
    pub fn new(graphs: Arc<GraphRegistry>, merge: Arc<MergeFunctions>, config: FederatedConfig) -> Self {
        FederatedOperationHandler {
            graphs,
            merge,
            config,
        }
    }

    fn policy(&self, operation: &dyn Operation) -> FailurePolicy {
        match operation.option(SKIP_FAILURES) {
            Some(value) if value.eq_ignore_ascii_case("true") => FailurePolicy::SkipFailures,
            Some(value) if value.eq_ignore_ascii_case("false") => FailurePolicy::FailFast,
            _ => self.config.failure_policy,
        }
    }

    fn requested_ids(&self, operation: &dyn Operation) -> Option<Vec<String>> {
        federated_graph_ids(operation).or_else(|| {
            (!self.config.default_graph_ids.is_empty())
                .then(|| self.config.default_graph_ids.clone())
        })
    }
}

/// Per-graph copy of `operation`, or `None` when the graph has nothing the
/// operation could touch.
pub(crate) fn plan_for(
    graph: &ConstituentGraph,
    operation: &dyn Operation,
) -> Option<Box<dyn Operation>> {
    let schema = graph.store.schema();
    let mut planned = operation.shallow_clone();
    planned.options_mut().shift_remove(FEDERATED_GRAPH_IDS);

    let restricted = match planned.view() {
        Some(view) if !view.is_unrestricted() => {
            let groups: IndexSet<String> = view
                .groups()
                .into_iter()
                .filter(|g| schema.has_group(g))
                .collect();
            if groups.is_empty() {
                return None;
            }
            Some(view.restrict_to_groups(&groups))
        }
        _ => None,
    };
    if let Some(view) = restricted {
        planned.set_view(view);
    }

    if let Some(add) = planned.as_any().downcast_ref::<AddElements>() {
        let elements: Vec<_> = add
            .input
            .iter()
            .filter(|e| schema.has_group(e.group()))
            .cloned()
            .collect();
        if elements.is_empty() {
            return None;
        }
        let mut narrowed = AddElements::new(elements)
            .with_validate(add.validate)
            .with_skip_invalid_elements(add.skip_invalid_elements);
        narrowed.options = add.options.clone();
        planned = Box::new(narrowed);
    }
    Some(planned)
}

/// Index, graph id, result and the failures the graph itself skipped
type TaskOutcome = (usize, String, OperationResult<Payload>, Vec<GraphFailure>);

/// Failure a constituent skipped internally, traced back through it
fn nested_failure(constituent: &str, failure: GraphFailure) -> GraphFailure {
    GraphFailure {
        graph_id: format!("{}/{}", constituent, failure.graph_id),
        error: failure.error,
    }
}

#[async_trait]
impl OperationHandler for FederatedOperationHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        ctx: &mut Context,
        store: &dyn Store,
    ) -> OperationResult<Payload> {
        let class = operation.class();
        let output_type = operation.output_type();
        let policy = self.policy(operation.as_ref());
        debug!(state = "PLANNING", operation = class, job_id = %ctx.job_id(), %policy, "federated call");

        let requested = self.requested_ids(operation.as_ref());
        let graphs = self.graphs.visible(ctx.user(), requested.as_deref())?;
        let planned: Vec<(ConstituentGraph, Box<dyn Operation>)> = graphs
            .into_iter()
            .filter_map(|graph| match plan_for(&graph, operation.as_ref()) {
                Some(op) => Some((graph, op)),
                None => {
                    debug!(graph_id = %graph.graph_id, operation = class, "skipping graph");
                    None
                }
            })
            .collect();
        if planned.is_empty() {
            info!(state = "COMPLETE", operation = class, graphs = 0, "no eligible graphs");
            return Ok(Payload::empty_of(output_type));
        }

        let semaphore = self
            .config
            .max_concurrency
            .map(|permits| Arc::new(Semaphore::new(permits)));
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
        let count = planned.len();
        for (index, (graph, op)) in planned.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let mut child = ctx.child();
            tasks.spawn(async move {
                let result = async {
                    let _permit = match semaphore {
                        Some(semaphore) => Some(semaphore.acquire_owned().await.map_err(|_| {
                            OperationError::Internal("federated semaphore closed".into())
                        })?),
                        None => None,
                    };
                    graph.store.execute(op, &mut child).await
                }
                .await;
                (index, graph.graph_id, result, child.take_partial_failures())
            });
        }
        debug!(state = "DISPATCHED", operation = class, graphs = count, "federated call");

        let mut results: Vec<Option<(String, Payload)>> = (0..count).map(|_| None).collect();
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, graph_id, result, nested) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tasks.abort_all();
                    warn!(state = "FAILED", operation = class, error = %e, "federated task did not complete");
                    return Err(OperationError::Internal(format!("federated task failed: {}", e)));
                }
            };
            match result {
                Ok(payload) => {
                    for failure in nested {
                        warn!(graph_id = %graph_id, failed = %failure.graph_id, "graph skipped a failure");
                        failures.push(nested_failure(&graph_id, failure));
                    }
                    results[index] = Some((graph_id, payload));
                }
                Err(error) => {
                    warn!(graph_id = %graph_id, operation = class, error = %error, "graph failed");
                    if policy == FailurePolicy::FailFast {
                        tasks.abort_all();
                        warn!(state = "FAILED", operation = class, "federated call");
                        return Err(OperationError::Graph {
                            graph_id,
                            source: Box::new(error),
                        });
                    }
                    failures.push(GraphFailure { graph_id, error });
                }
            }
        }

        let survivors: Vec<(String, Payload)> = results.into_iter().flatten().collect();
        if survivors.is_empty() && !failures.is_empty() {
            warn!(state = "FAILED", operation = class, failed = failures.len(), "every graph failed");
            return Err(OperationError::PartialFailure(failures));
        }
        for failure in failures {
            ctx.record_failure(failure);
        }

        debug!(state = "MERGING", operation = class, results = survivors.len(), "federated call");
        let merged = self.merge.merge(output_type, survivors);
        match &merged {
            Ok(_) => info!(
                state = "COMPLETE",
                graph_id = %store.graph_id(),
                operation = class,
                failed = ctx.partial_failures().len(),
                "federated call"
            ),
            Err(e) => warn!(state = "FAILED", operation = class, error = %e, "merge failed"),
        }
        merged
    }
}

/// Creates and registers a new constituent graph
pub struct AddGraphHandler {
    graphs: Arc<GraphRegistry>,
    library: Option<Arc<dyn GraphLibrary>>,
}

impl AddGraphHandler {
    pub fn new(graphs: Arc<GraphRegistry>, library: Option<Arc<dyn GraphLibrary>>) -> Self {
        AddGraphHandler { graphs, library }
    }

    fn resolve_schema(&self, add: &AddGraph) -> OperationResult<Schema> {
        let mut schema = add.schema.clone();
        for parent_id in &add.parent_schema_ids {
            let parent = self
                .library
                .as_ref()
                .map(|library| library.get_schema(parent_id))
                .transpose()?
                .flatten()
                .ok_or_else(|| {
                    OperationError::Store(format!(
                        "Schema could not be found in the graph library with id: {}",
                        parent_id
                    ))
                })?;
            schema = Some(match schema {
                None => parent,
                Some(current) => current.merge(&parent)?,
            });
        }
        if let Some(schema) = schema {
            return Ok(schema);
        }
        self.from_library(&add.graph_id)?
            .map(|(schema, _)| schema)
            .ok_or_else(|| {
                OperationError::Store(format!("No schema was given for graph {}", add.graph_id))
            })
    }

    fn resolve_properties(&self, add: &AddGraph) -> OperationResult<StoreProperties> {
        let parent = match &add.parent_properties_id {
            Some(parent_id) => Some(
                self.library
                    .as_ref()
                    .map(|library| library.get_properties(parent_id))
                    .transpose()?
                    .flatten()
                    .ok_or_else(|| {
                        OperationError::Store(format!(
                            "Store properties could not be found in the graph library with id: {}",
                            parent_id
                        ))
                    })?,
            ),
            None => None,
        };
        match (parent, &add.store_properties) {
            (Some(mut parent), Some(own)) => {
                for (key, value) in own.iter() {
                    parent.set(key, value);
                }
                Ok(parent)
            }
            (Some(parent), None) => Ok(parent),
            (None, Some(own)) => Ok(own.clone()),
            (None, None) => self
                .from_library(&add.graph_id)?
                .map(|(_, properties)| properties)
                .ok_or_else(|| {
                    OperationError::Store(format!(
                        "No store properties were given for graph {}",
                        add.graph_id
                    ))
                }),
        }
    }

    fn from_library(&self, graph_id: &str) -> OperationResult<Option<(Schema, StoreProperties)>> {
        match &self.library {
            Some(library) => Ok(library.get(graph_id)?),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OperationHandler for AddGraphHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        ctx: &mut Context,
        _store: &dyn Store,
    ) -> OperationResult<Payload> {
        let add = downcast::<AddGraph>(operation)?;
        validate_graph_id(&add.graph_id)?;
        if self.graphs.get(&add.graph_id)?.is_some() {
            return Err(OperationError::GraphAlreadyExists(add.graph_id.clone()));
        }
        let schema = self.resolve_schema(&add)?;
        let properties = self.resolve_properties(&add)?;
        if let Some(library) = &self.library {
            library.add(&add.graph_id, &schema, &properties)?;
        }
        let store = create_store(&add.graph_id, schema, properties)?;
        let access = GraphAccess {
            owner: ctx.user().user_id.clone(),
            auths: add.graph_auths.clone(),
            public: add.is_public,
        };
        self.graphs.add(ConstituentGraph {
            graph_id: add.graph_id.clone(),
            store,
            access,
        })?;
        Ok(Payload::Empty)
    }
}

/// Removes a constituent graph owned by the requesting user
pub struct RemoveGraphHandler {
    graphs: Arc<GraphRegistry>,
}

impl RemoveGraphHandler {
    pub fn new(graphs: Arc<GraphRegistry>) -> Self {
        RemoveGraphHandler { graphs }
    }
}

#[async_trait]
impl OperationHandler for RemoveGraphHandler {
    async fn do_operation(
        &self,
        operation: Box<dyn Operation>,
        ctx: &mut Context,
        _store: &dyn Store,
    ) -> OperationResult<Payload> {
        let remove = downcast::<RemoveGraph>(operation)?;
        self.graphs.remove(&remove.graph_id, ctx.user())?;
        Ok(Payload::Empty)
    }
}

/// Ids of the graphs the requesting user may use
pub struct GetAllGraphIdsHandler {
    graphs: Arc<GraphRegistry>,
}

impl GetAllGraphIdsHandler {
    pub fn new(graphs: Arc<GraphRegistry>) -> Self {
        GetAllGraphIdsHandler { graphs }
    }
}

#[async_trait]
impl OperationHandler for GetAllGraphIdsHandler {
    async fn do_operation(
        &self,
        _operation: Box<dyn Operation>,
        ctx: &mut Context,
        _store: &dyn Store,
    ) -> OperationResult<Payload> {
        Ok(Payload::Strings(self.graphs.ids(ctx.user())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Edge, Entity};
    use crate::operation::GetAllElements;
    use crate::schema::{SchemaElementDefinition, TypeDefinition};
    use crate::store::MemoryStore;
    use crate::view::View;

    fn edge_graph() -> ConstituentGraph {
        let schema = Schema::builder()
            .type_def("string", TypeDefinition::new("String"))
            .edge("edge", SchemaElementDefinition::edge("string", "string"))
            .build()
            .unwrap();
        ConstituentGraph {
            graph_id: "edges".into(),
            store: Arc::new(MemoryStore::new("edges", schema, StoreProperties::memory()).unwrap()),
            access: GraphAccess::public(),
        }
    }

    #[test]
    fn test_plan_restricts_view() {
        let graph = edge_graph();
        let view = View::builder()
            .edge_group("edge")
            .entity_group("entity")
            .build()
            .unwrap();
        let mut get = GetAllElements::new().with_view(view);
        get.options
            .insert(FEDERATED_GRAPH_IDS.into(), "edges".into());

        let planned = plan_for(&graph, &get).unwrap();
        let groups: Vec<String> = planned.view().unwrap().groups().into_iter().collect();
        assert_eq!(groups, vec!["edge"]);
        assert_eq!(planned.option(FEDERATED_GRAPH_IDS), None);

        let entities_only = GetAllElements::new()
            .with_view(View::builder().entity_group("entity").build().unwrap());
        assert!(plan_for(&graph, &entities_only).is_none());
    }

    #[test]
    fn test_plan_narrows_added_elements() {
        let graph = edge_graph();
        let add = AddElements::new(vec![
            Edge::new("edge", "A", "B", true).into(),
            Entity::new("entity", "A").into(),
        ]);
        let planned = plan_for(&graph, &add).unwrap();
        let narrowed = planned.as_any().downcast_ref::<AddElements>().unwrap();
        assert_eq!(narrowed.input.len(), 1);

        let entities = AddElements::new(vec![Entity::new("entity", "A").into()]);
        assert!(plan_for(&graph, &entities).is_none());
    }
}
