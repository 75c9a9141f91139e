//! Store fanning operations out to constituent graphs

use super::graph::{ConstituentGraph, GraphAccess, GraphRegistry};
use super::handler::{
    AddGraphHandler, FederatedOperationHandler, GetAllGraphIdsHandler, RemoveGraphHandler,
};
use super::merge::MergeFunctions;
use crate::config::FederatedConfig;
use crate::library::GraphLibrary;
use crate::operation::{Operation, OperationResult, Payload, GET_FAMILY, OUTPUT_FAMILY};
use crate::schema::Schema;
use crate::store::{
    dispatch, register_core_handlers, Context, HandlerRegistry, Store, StoreProperties, STORE_CLASS,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub const FEDERATED_STORE_CLASS: &str = "federated";

/// Store whose reads and writes run against its constituent graphs.
///
/// Operations that only transform their input run locally; every other
/// operation with an output, and `AddElements`, is sent to each eligible
/// constituent and the results merged.
pub struct FederatedStore {
    graph_id: String,
    graphs: Arc<GraphRegistry>,
    library: Option<Arc<dyn GraphLibrary>>,
    config: FederatedConfig,
    properties: StoreProperties,
    registry: HandlerRegistry,
}

impl FederatedStore {
    pub fn new(
        graph_id: impl Into<String>,
        config: FederatedConfig,
        library: Option<Arc<dyn GraphLibrary>>,
    ) -> OperationResult<Self> {
        Self::with_merge_functions(graph_id, config, library, MergeFunctions::default())
    }

    pub fn with_merge_functions(
        graph_id: impl Into<String>,
        config: FederatedConfig,
        library: Option<Arc<dyn GraphLibrary>>,
        merge: MergeFunctions,
    ) -> OperationResult<Self> {
        config.validate()?;
        let graph_id = graph_id.into();
        let graphs = Arc::new(GraphRegistry::new());
        let registry = HandlerRegistry::new();
        register_core_handlers(&registry)?;

        let fan_out = Arc::new(FederatedOperationHandler::new(
            Arc::clone(&graphs),
            Arc::new(merge),
            config.clone(),
        ));
        for class in [OUTPUT_FAMILY, GET_FAMILY, "AddElements"] {
            registry.register(class, fan_out.clone())?;
        }
        registry.register(
            "AddGraph",
            Arc::new(AddGraphHandler::new(Arc::clone(&graphs), library.clone())),
        )?;
        registry.register("RemoveGraph", Arc::new(RemoveGraphHandler::new(Arc::clone(&graphs))))?;
        registry.register(
            "GetAllGraphIds",
            Arc::new(GetAllGraphIdsHandler::new(Arc::clone(&graphs))),
        )?;

        info!(
            graph_id = %graph_id,
            failure_policy = %config.failure_policy,
            max_concurrency = ?config.max_concurrency,
            "initialised federated store"
        );
        Ok(FederatedStore {
            graph_id,
            graphs,
            library,
            config,
            properties: StoreProperties::new().with(STORE_CLASS, FEDERATED_STORE_CLASS),
            registry,
        })
    }

    /// Register an existing store as a constituent graph
    pub fn add_graph(
        &self,
        graph_id: impl Into<String>,
        store: Arc<dyn Store>,
        access: GraphAccess,
    ) -> OperationResult<()> {
        let graph_id = graph_id.into();
        if let Some(library) = &self.library {
            library.add(&graph_id, &store.schema(), store.properties())?;
        }
        self.graphs.add(ConstituentGraph {
            graph_id,
            store,
            access,
        })
    }

    pub fn graphs(&self) -> &GraphRegistry {
        &self.graphs
    }

    pub fn config(&self) -> &FederatedConfig {
        &self.config
    }
}

#[async_trait]
impl Store for FederatedStore {
    fn graph_id(&self) -> &str {
        &self.graph_id
    }

    /// Merge of every constituent schema; conflicting schemas are left out
    fn schema(&self) -> Arc<Schema> {
        let graphs = match self.graphs.all() {
            Ok(graphs) => graphs,
            Err(e) => {
                warn!(graph_id = %self.graph_id, error = %e, "cannot read constituent graphs");
                return Arc::new(Schema::default());
            }
        };
        let mut merged = Schema::default();
        for graph in graphs {
            match merged.merge(&graph.store.schema()) {
                Ok(schema) => merged = schema,
                Err(e) => {
                    warn!(graph_id = %graph.graph_id, error = %e, "schema left out of federated schema")
                }
            }
        }
        Arc::new(merged)
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
