use anyhow::Context as _;
use graphweave::element::{Edge, Element, Entity};
use graphweave::federated::{FederatedStore, GraphAccess};
use graphweave::function::{BinaryOperator, ElementFilter, Predicate};
use graphweave::operation::{
    AddElements, Count, CountGroups, Filter, GetAllElements, OperationChain, Payload,
};
use graphweave::schema::{Schema, SchemaElementDefinition, TypeDefinition};
use graphweave::store::{Context, MemoryStore, Store, StoreProperties};
use graphweave::EngineConfig;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_file(&path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => {
            let mut config = EngineConfig::default();
            config.apply_env()?;
            config
        }
    };

    // Initialize tracing; RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("Graphweave v{}", graphweave::version());
    println!("==========================================");
    println!();

    let schema = demo_schema()?;
    let federated = FederatedStore::new("federated", config.federated.clone(), None)?;
    for graph_id in ["east", "west"] {
        let store = MemoryStore::new(graph_id, schema.clone(), StoreProperties::memory())?;
        federated.add_graph(graph_id, Arc::new(store), GraphAccess::public())?;
        println!("✓ Added graph {}", graph_id);
    }

    let mut ctx = Context::default();
    let add = AddElements::new(vec![
        edge("A", "B", 3),
        edge("A", "B", 5),
        edge("B", "C", 10),
        Entity::new("vertex", "A").into(),
    ]);
    federated.execute(Box::new(add), &mut ctx).await?;

    let busy = Filter::new().edge(
        "road",
        ElementFilter::builder()
            .select(["count"])
            .execute(Predicate::is_more_than(6i64))
            .build(),
    );
    let chain = OperationChain::new(vec![
        Box::new(GetAllElements::new()),
        Box::new(busy),
        Box::new(Count::new()),
    ])?;
    if let Payload::Count(count) = federated.execute(Box::new(chain), &mut ctx).await? {
        println!("✓ Busy roads across graphs: {}", count);
    }

    let groups = OperationChain::new(vec![
        Box::new(GetAllElements::new()),
        Box::new(CountGroups::new()),
    ])?;
    if let Payload::GroupCounts(groups) = federated.execute(Box::new(groups), &mut ctx).await? {
        for (group, count) in &groups.counts {
            println!("✓ {}: {}", group, count);
        }
    }

    Ok(())
}

fn demo_schema() -> anyhow::Result<Schema> {
    let schema = Schema::builder()
        .type_def("vertex", TypeDefinition::new("String"))
        .type_def(
            "count",
            TypeDefinition::new("Integer").with_aggregate_function(BinaryOperator::Sum),
        )
        .entity("vertex", SchemaElementDefinition::entity("vertex"))
        .edge(
            "road",
            SchemaElementDefinition::edge("vertex", "vertex").property("count", "count"),
        )
        .build()?;
    Ok(schema)
}

fn edge(source: &str, destination: &str, count: i64) -> Element {
    Edge::new("road", source, destination, true)
        .with_property("count", count)
        .into()
}
