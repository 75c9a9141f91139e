//! Constituent graphs of a federated store

use crate::operation::{OperationError, OperationResult};
use crate::store::{Store, User};
use indexmap::{IndexMap, IndexSet};
use std::sync::{Arc, RwLock};
use tracing::info;

/// Who may run operations against a constituent graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphAccess {
    pub owner: String,
    /// Any one of these operation auths grants access
    pub auths: IndexSet<String>,
    pub public: bool,
}

impl GraphAccess {
    pub fn new(owner: impl Into<String>) -> Self {
        GraphAccess {
            owner: owner.into(),
            ..Default::default()
        }
    }

    /// Access open to every user
    pub fn public() -> Self {
        GraphAccess {
            public: true,
            ..Default::default()
        }
    }

    pub fn with_auths<I, S>(mut self, auths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auths = auths.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_valid_to_execute(&self, user: &User) -> bool {
        self.public
            || self.owner == user.user_id
            || user.op_auths.iter().any(|auth| self.auths.contains(auth))
    }
}

/// A backend store registered under a graph id
#[derive(Clone)]
pub struct ConstituentGraph {
    pub graph_id: String,
    pub store: Arc<dyn Store>,
    pub access: GraphAccess,
}

/// Constituents in declaration order
#[derive(Default)]
pub struct GraphRegistry {
    graphs: RwLock<IndexMap<String, ConstituentGraph>>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        GraphRegistry::default()
    }

    pub fn add(&self, graph: ConstituentGraph) -> OperationResult<()> {
        let mut graphs = self
            .graphs
            .write()
            .map_err(|_| OperationError::Internal("graph registry lock poisoned".into()))?;
        if graphs.contains_key(&graph.graph_id) {
            return Err(OperationError::GraphAlreadyExists(graph.graph_id));
        }
        info!(graph_id = %graph.graph_id, owner = %graph.access.owner, "added constituent graph");
        graphs.insert(graph.graph_id.clone(), graph);
        Ok(())
    }

    /// Remove a graph. Only its owner may do so.
    pub fn remove(&self, graph_id: &str, user: &User) -> OperationResult<ConstituentGraph> {
        let mut graphs = self
            .graphs
            .write()
            .map_err(|_| OperationError::Internal("graph registry lock poisoned".into()))?;
        let owner = graphs.get(graph_id).map(|g| g.access.owner.clone());
        match owner {
            None => Err(OperationError::GraphNotFound(graph_id.to_string())),
            Some(owner) if owner != user.user_id => {
                Err(OperationError::Unauthorised(user.user_id.clone()))
            }
            Some(_) => {
                info!(graph_id, "removed constituent graph");
                graphs
                    .shift_remove(graph_id)
                    .ok_or_else(|| OperationError::GraphNotFound(graph_id.to_string()))
            }
        }
    }

    pub fn get(&self, graph_id: &str) -> OperationResult<Option<ConstituentGraph>> {
        let graphs = self
            .graphs
            .read()
            .map_err(|_| OperationError::Internal("graph registry lock poisoned".into()))?;
        Ok(graphs.get(graph_id).cloned())
    }

    /// Graphs `user` may use. With `requested` ids only those are returned, in
    /// declaration order, and an unknown or inaccessible id is an error.
    pub fn visible(
        &self,
        user: &User,
        requested: Option<&[String]>,
    ) -> OperationResult<Vec<ConstituentGraph>> {
        let graphs = self
            .graphs
            .read()
            .map_err(|_| OperationError::Internal("graph registry lock poisoned".into()))?;
        match requested {
            None => Ok(graphs
                .values()
                .filter(|g| g.access.is_valid_to_execute(user))
                .cloned()
                .collect()),
            Some(ids) => {
                for id in ids {
                    let accessible = graphs
                        .get(id)
                        .map_or(false, |g| g.access.is_valid_to_execute(user));
                    if !accessible {
                        return Err(OperationError::GraphNotFound(id.clone()));
                    }
                }
                Ok(graphs
                    .values()
                    .filter(|g| ids.contains(&g.graph_id))
                    .cloned()
                    .collect())
            }
        }
    }

    /// Ids of the graphs `user` may use
    pub fn ids(&self, user: &User) -> OperationResult<Vec<String>> {
        Ok(self
            .visible(user, None)?
            .into_iter()
            .map(|g| g.graph_id)
            .collect())
    }

    pub fn all(&self) -> OperationResult<Vec<ConstituentGraph>> {
        let graphs = self
            .graphs
            .read()
            .map_err(|_| OperationError::Internal("graph registry lock poisoned".into()))?;
        Ok(graphs.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::store::{MemoryStore, StoreProperties};

    fn graph(id: &str, access: GraphAccess) -> ConstituentGraph {
        let store = MemoryStore::new(id, Schema::default(), StoreProperties::memory()).unwrap();
        ConstituentGraph {
            graph_id: id.to_string(),
            store: Arc::new(store),
            access,
        }
    }

    #[test]
    fn test_access() {
        let alice = User::new("alice");
        let bob = User::new("bob").with_op_auths(["ops"]);
        let owned = GraphAccess::new("alice");
        assert!(owned.is_valid_to_execute(&alice));
        assert!(!owned.is_valid_to_execute(&bob));
        assert!(owned.clone().with_auths(["ops"]).is_valid_to_execute(&bob));
        assert!(GraphAccess::public().is_valid_to_execute(&User::unknown()));
    }

    #[test]
    fn test_visible_in_declaration_order() {
        let registry = GraphRegistry::new();
        registry.add(graph("a", GraphAccess::public())).unwrap();
        registry.add(graph("b", GraphAccess::new("alice"))).unwrap();
        registry.add(graph("c", GraphAccess::public())).unwrap();
        assert!(matches!(
            registry.add(graph("a", GraphAccess::public())),
            Err(OperationError::GraphAlreadyExists(_))
        ));

        let bob = User::new("bob");
        assert_eq!(registry.ids(&bob).unwrap(), vec!["a", "c"]);

        let requested = vec!["c".to_string(), "a".to_string()];
        let ids: Vec<String> = registry
            .visible(&bob, Some(&requested))
            .unwrap()
            .into_iter()
            .map(|g| g.graph_id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);

        let hidden = vec!["b".to_string()];
        assert!(matches!(
            registry.visible(&bob, Some(&hidden)),
            Err(OperationError::GraphNotFound(_))
        ));
    }

    #[test]
    fn test_remove_requires_owner() {
        let registry = GraphRegistry::new();
        registry.add(graph("g", GraphAccess::new("alice"))).unwrap();
        assert!(matches!(
            registry.remove("g", &User::new("bob")),
            Err(OperationError::Unauthorised(_))
        ));
        assert!(registry.remove("g", &User::new("alice")).is_ok());
        assert!(matches!(
            registry.remove("g", &User::new("alice")),
            Err(OperationError::GraphNotFound(_))
        ));
    }
}
