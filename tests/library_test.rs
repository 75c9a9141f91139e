//! Graph library conflicts and AddGraph resolution through the library

use graphweave::config::FederatedConfig;
use graphweave::federated::FederatedStore;
use graphweave::library::{GraphLibrary, HashMapGraphLibrary, LibraryError};
use graphweave::operation::{AddGraph, GetAllGraphIds, OperationError, Payload};
use graphweave::schema::{Schema, SchemaElementDefinition, TypeDefinition};
use graphweave::store::{Context, Store, StoreProperties, User};
use std::sync::Arc;

fn schema(group: &str) -> Schema {
    Schema::builder()
        .type_def("string", TypeDefinition::new("String"))
        .entity(group, SchemaElementDefinition::entity("string"))
        .build()
        .unwrap()
}

#[test]
fn test_conflicting_schema_is_rejected() {
    let library = HashMapGraphLibrary::new();
    let properties = StoreProperties::memory();
    library.add("g", &schema("s1"), &properties).unwrap();

    let conflict = library.add("g", &schema("s2"), &properties);
    assert_eq!(
        conflict,
        Err(LibraryError::Overwriting(
            "GraphId g already exists with a different schema".to_string()
        ))
    );

    let again = library.add("g", &schema("s1"), &properties);
    assert!(again.is_ok(), "identical re-add should succeed: {:?}", again.as_ref().err());
    assert_eq!(library.get("g").unwrap(), Some((schema("s1"), properties)));
}

#[test]
fn test_conflicting_properties_are_rejected() {
    let library = HashMapGraphLibrary::new();
    library.add("g", &schema("s1"), &StoreProperties::memory()).unwrap();
    let other = StoreProperties::memory().with("job_tracker", "true");
    match library.add("g", &schema("s1"), &other) {
        Err(LibraryError::Overwriting(message)) => {
            assert_eq!(message, "GraphId g already exists with a different store properties")
        }
        result => panic!("expected conflict, got {:?}", result),
    }
}

#[tokio::test]
async fn test_add_graph_from_library_definition() {
    let library = Arc::new(HashMapGraphLibrary::new());
    library
        .add("stored", &schema("entity"), &StoreProperties::memory())
        .unwrap();
    let store = FederatedStore::new(
        "federated",
        FederatedConfig::default(),
        Some(library.clone() as Arc<dyn GraphLibrary>),
    )
    .unwrap();
    let mut ctx = Context::new(User::new("alice"));

    store
        .execute(Box::new(AddGraph::new("stored").public(true)), &mut ctx)
        .await
        .unwrap();
    match store.execute(Box::new(GetAllGraphIds::new()), &mut ctx).await.unwrap() {
        Payload::Strings(ids) => assert_eq!(ids, vec!["stored".to_string()]),
        other => panic!("expected graph ids, got {:?}", other),
    }

    let invalid = store
        .execute(
            Box::new(AddGraph::new("not valid").with_schema(schema("entity"))),
            &mut ctx,
        )
        .await;
    match invalid {
        Err(OperationError::Library(LibraryError::InvalidGraphId(id))) => assert_eq!(id, "not valid"),
        other => panic!("expected invalid id, got {:?}", other),
    }

    let fresh = store
        .execute(
            Box::new(
                AddGraph::new("fresh")
                    .with_schema(schema("entity"))
                    .with_store_properties(StoreProperties::memory()),
            ),
            &mut ctx,
        )
        .await;
    assert!(fresh.is_ok(), "new graph should be added: {:?}", fresh.as_ref().err());

    let missing_parent = store
        .execute(
            Box::new(
                AddGraph::new("other")
                    .with_parent_schema_ids(["missing"])
                    .with_store_properties(StoreProperties::memory()),
            ),
            &mut ctx,
        )
        .await;
    assert!(matches!(missing_parent, Err(OperationError::Store(_))));
}
