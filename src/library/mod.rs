//! Graph library
//!
//! Records the schema and store properties each graph id was created with.
//! A graph id points at a schema id and a properties id, which default to the
//! graph id itself. Adding an id again with identical content is a no-op;
//! adding it with different content is an overwriting conflict.

use crate::schema::Schema;
use crate::store::StoreProperties;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};
use thiserror::Error;
use tracing::{debug, info};

/// Graph library errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LibraryError {
    /// Graph id outside `[a-zA-Z0-9_]*`
    #[error("graphId {0} is invalid, it must match regex: [a-zA-Z0-9_]*")]
    InvalidGraphId(String),

    /// An id already maps to different content
    #[error("{0}")]
    Overwriting(String),

    #[error("Graph library error: {0}")]
    Internal(String),
}

pub type LibraryResult<T> = Result<T, LibraryError>;

static GRAPH_ID: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]*$"));

pub fn validate_graph_id(graph_id: &str) -> LibraryResult<()> {
    if GRAPH_ID.as_ref().map_or(false, |re| re.is_match(graph_id)) {
        Ok(())
    } else {
        Err(LibraryError::InvalidGraphId(graph_id.to_string()))
    }
}

/// Store of graph definitions shared between graphs
pub trait GraphLibrary: Send + Sync {
    /// Add a graph whose schema and properties ids equal its graph id
    fn add(&self, graph_id: &str, schema: &Schema, properties: &StoreProperties) -> LibraryResult<()> {
        self.add_with_ids(graph_id, graph_id, schema, graph_id, properties)
    }

    fn add_with_ids(
        &self,
        graph_id: &str,
        schema_id: &str,
        schema: &Schema,
        properties_id: &str,
        properties: &StoreProperties,
    ) -> LibraryResult<()>;

    /// Add a graph, replacing whatever it was before
    fn add_or_update(
        &self,
        graph_id: &str,
        schema: &Schema,
        properties: &StoreProperties,
    ) -> LibraryResult<()>;

    fn get(&self, graph_id: &str) -> LibraryResult<Option<(Schema, StoreProperties)>>;

    /// Schema id and properties id of a graph
    fn get_ids(&self, graph_id: &str) -> LibraryResult<Option<(String, String)>>;

    fn add_schema(&self, schema_id: &str, schema: &Schema) -> LibraryResult<()>;

    fn add_or_update_schema(&self, schema_id: &str, schema: &Schema) -> LibraryResult<()>;

    fn get_schema(&self, schema_id: &str) -> LibraryResult<Option<Schema>>;

    fn add_properties(&self, properties_id: &str, properties: &StoreProperties) -> LibraryResult<()>;

    fn add_or_update_properties(
        &self,
        properties_id: &str,
        properties: &StoreProperties,
    ) -> LibraryResult<()>;

    fn get_properties(&self, properties_id: &str) -> LibraryResult<Option<StoreProperties>>;

    /// Fail if `graph_id` exists with a different schema or properties
    fn check_existing(
        &self,
        graph_id: &str,
        schema: &Schema,
        properties: &StoreProperties,
    ) -> LibraryResult<()> {
        validate_graph_id(graph_id)?;
        if let Some((existing_schema, existing_properties)) = self.get(graph_id)? {
            if existing_schema != *schema {
                return Err(LibraryError::Overwriting(format!(
                    "GraphId {} already exists with a different schema",
                    graph_id
                )));
            }
            if existing_properties != *properties {
                return Err(LibraryError::Overwriting(format!(
                    "GraphId {} already exists with a different store properties",
                    graph_id
                )));
            }
        }
        Ok(())
    }

    /// Forget a graph id. Its schema and properties stay available.
    fn remove(&self, graph_id: &str) -> LibraryResult<bool>;
}

#[derive(Default)]
struct Entries {
    graphs: HashMap<String, (String, String)>,
    schemas: HashMap<String, Schema>,
    properties: HashMap<String, StoreProperties>,
}

/// In-memory graph library
#[derive(Default)]
pub struct HashMapGraphLibrary {
    entries: RwLock<Entries>,
}

impl HashMapGraphLibrary {
    pub fn new() -> Self {
        HashMapGraphLibrary::default()
    }

    fn read(&self) -> LibraryResult<std::sync::RwLockReadGuard<'_, Entries>> {
        self.entries
            .read()
            .map_err(|_| LibraryError::Internal("graph library lock poisoned".into()))
    }

    fn write(&self) -> LibraryResult<std::sync::RwLockWriteGuard<'_, Entries>> {
        self.entries
            .write()
            .map_err(|_| LibraryError::Internal("graph library lock poisoned".into()))
    }
}

fn check_schema_id(entries: &Entries, schema_id: &str, schema: &Schema) -> LibraryResult<()> {
    match entries.schemas.get(schema_id) {
        Some(existing) if existing != schema => Err(LibraryError::Overwriting(format!(
            "schemaId {} already exists with a different schema",
            schema_id
        ))),
        _ => Ok(()),
    }
}

fn check_properties_id(
    entries: &Entries,
    properties_id: &str,
    properties: &StoreProperties,
) -> LibraryResult<()> {
    match entries.properties.get(properties_id) {
        Some(existing) if existing != properties => Err(LibraryError::Overwriting(format!(
            "propertiesId {} already exists with a different store properties",
            properties_id
        ))),
        _ => Ok(()),
    }
}

impl GraphLibrary for HashMapGraphLibrary {
    fn add_with_ids(
        &self,
        graph_id: &str,
        schema_id: &str,
        schema: &Schema,
        properties_id: &str,
        properties: &StoreProperties,
    ) -> LibraryResult<()> {
        self.check_existing(graph_id, schema, properties)?;
        let mut entries = self.write()?;
        if let Some((existing_schema_id, existing_properties_id)) = entries.graphs.get(graph_id) {
            if existing_schema_id != schema_id || existing_properties_id != properties_id {
                return Err(LibraryError::Overwriting(format!(
                    "GraphId {} already exists with different schema or store properties ids",
                    graph_id
                )));
            }
        }
        check_schema_id(&entries, schema_id, schema)?;
        check_properties_id(&entries, properties_id, properties)?;

        entries.schemas.insert(schema_id.to_string(), schema.clone());
        entries
            .properties
            .insert(properties_id.to_string(), properties.clone());
        entries.graphs.insert(
            graph_id.to_string(),
            (schema_id.to_string(), properties_id.to_string()),
        );
        info!(graph_id, schema_id, properties_id, "added graph to library");
        Ok(())
    }

    fn add_or_update(
        &self,
        graph_id: &str,
        schema: &Schema,
        properties: &StoreProperties,
    ) -> LibraryResult<()> {
        validate_graph_id(graph_id)?;
        let mut entries = self.write()?;
        entries.schemas.insert(graph_id.to_string(), schema.clone());
        entries
            .properties
            .insert(graph_id.to_string(), properties.clone());
        entries
            .graphs
            .insert(graph_id.to_string(), (graph_id.to_string(), graph_id.to_string()));
        info!(graph_id, "updated graph in library");
        Ok(())
    }

    fn get(&self, graph_id: &str) -> LibraryResult<Option<(Schema, StoreProperties)>> {
        let entries = self.read()?;
        let Some((schema_id, properties_id)) = entries.graphs.get(graph_id) else {
            return Ok(None);
        };
        let schema = entries.schemas.get(schema_id).cloned().unwrap_or_default();
        let properties = entries
            .properties
            .get(properties_id)
            .cloned()
            .unwrap_or_default();
        Ok(Some((schema, properties)))
    }

    fn get_ids(&self, graph_id: &str) -> LibraryResult<Option<(String, String)>> {
        Ok(self.read()?.graphs.get(graph_id).cloned())
    }

    fn add_schema(&self, schema_id: &str, schema: &Schema) -> LibraryResult<()> {
        let mut entries = self.write()?;
        check_schema_id(&entries, schema_id, schema)?;
        entries.schemas.insert(schema_id.to_string(), schema.clone());
        debug!(schema_id, "added schema to library");
        Ok(())
    }

    fn add_or_update_schema(&self, schema_id: &str, schema: &Schema) -> LibraryResult<()> {
        self.write()?
            .schemas
            .insert(schema_id.to_string(), schema.clone());
        Ok(())
    }

    fn get_schema(&self, schema_id: &str) -> LibraryResult<Option<Schema>> {
        Ok(self.read()?.schemas.get(schema_id).cloned())
    }

    fn add_properties(&self, properties_id: &str, properties: &StoreProperties) -> LibraryResult<()> {
        let mut entries = self.write()?;
        check_properties_id(&entries, properties_id, properties)?;
        entries
            .properties
            .insert(properties_id.to_string(), properties.clone());
        debug!(properties_id, "added store properties to library");
        Ok(())
    }

    fn add_or_update_properties(
        &self,
        properties_id: &str,
        properties: &StoreProperties,
    ) -> LibraryResult<()> {
        self.write()?
            .properties
            .insert(properties_id.to_string(), properties.clone());
        Ok(())
    }

    fn get_properties(&self, properties_id: &str) -> LibraryResult<Option<StoreProperties>> {
        Ok(self.read()?.properties.get(properties_id).cloned())
    }

    fn remove(&self, graph_id: &str) -> LibraryResult<bool> {
        let removed = self.write()?.graphs.remove(graph_id).is_some();
        if removed {
            info!(graph_id, "removed graph from library");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaElementDefinition, TypeDefinition};

    fn schema(group: &str) -> Schema {
        Schema::builder()
            .type_def("string", TypeDefinition::new("String"))
            .entity(group, SchemaElementDefinition::entity("string"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_add_and_get() {
        let library = HashMapGraphLibrary::new();
        library.add("g", &schema("a"), &StoreProperties::memory()).unwrap();
        assert_eq!(
            library.get("g").unwrap(),
            Some((schema("a"), StoreProperties::memory()))
        );
        assert_eq!(
            library.get_ids("g").unwrap(),
            Some(("g".to_string(), "g".to_string()))
        );
        assert_eq!(library.get("missing").unwrap(), None);
    }

    #[test]
    fn test_invalid_graph_id() {
        let library = HashMapGraphLibrary::new();
        let result = library.add("g@#", &schema("a"), &StoreProperties::memory());
        assert_eq!(result, Err(LibraryError::InvalidGraphId("g@#".into())));
    }

    #[test]
    fn test_conflicts_and_identical_re_add() {
        let library = HashMapGraphLibrary::new();
        let props = StoreProperties::memory();
        library.add("g", &schema("a"), &props).unwrap();

        let error = library.add("g", &schema("b"), &props).unwrap_err();
        assert!(error.to_string().contains("already exists with a different schema"));

        let other_props = props.clone().with("testKey", "testValue");
        let error = library.add("g", &schema("a"), &other_props).unwrap_err();
        assert!(error
            .to_string()
            .contains("already exists with a different store properties"));

        assert!(library.add("g", &schema("a"), &props).is_ok());
    }

    #[test]
    fn test_schema_id_clash_leaves_library_unchanged() {
        let library = HashMapGraphLibrary::new();
        library.add_schema("shared", &schema("a")).unwrap();
        let error = library
            .add_with_ids("graph", "shared", &schema("b"), "props", &StoreProperties::memory())
            .unwrap_err();
        assert!(error
            .to_string()
            .contains("schemaId shared already exists with a different schema"));
        assert_eq!(library.get_schema("shared").unwrap(), Some(schema("a")));
        assert_eq!(library.get("graph").unwrap(), None);
    }

    #[test]
    fn test_add_or_update_replaces() {
        let library = HashMapGraphLibrary::new();
        library
            .add_or_update("g", &schema("a"), &StoreProperties::memory())
            .unwrap();
        let updated = StoreProperties::memory().with("k", "v");
        library.add_or_update("g", &schema("a"), &updated).unwrap();
        assert_eq!(library.get_properties("g").unwrap(), Some(updated));

        library.add_or_update_schema("s", &schema("a")).unwrap();
        library.add_or_update_schema("s", &schema("b")).unwrap();
        assert_eq!(library.get_schema("s").unwrap(), Some(schema("b")));
    }

    #[test]
    fn test_remove() {
        let library = HashMapGraphLibrary::new();
        library.add("g", &schema("a"), &StoreProperties::memory()).unwrap();
        assert!(library.remove("g").unwrap());
        assert!(!library.remove("g").unwrap());
        assert_eq!(library.get_schema("g").unwrap(), Some(schema("a")));
    }
}
