//! Entities and edges
//!
//! Equality and hashing cover the concrete type, group, identifiers, the
//! directed flag for edges and the property bag. An edge's matched vertex is
//! transient and takes no part in either.

use super::id::{ElementSeed, IdentifierType, MatchedVertex, GROUP, PROPERTIES};
use super::property::{Properties, PropertyValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Group given to elements built without one
pub const DEFAULT_GROUP: &str = "UNKNOWN";

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

/// Element with a single vertex identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default = "default_group")]
    pub group: String,
    pub vertex: PropertyValue,
    #[serde(default)]
    pub properties: Properties,
}

impl Entity {
    pub fn new(group: impl Into<String>, vertex: impl Into<PropertyValue>) -> Self {
        Entity {
            group: group.into(),
            vertex: vertex.into(),
            properties: Properties::new(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.put(name, value);
        self
    }
}

/// Element connecting a source and a destination vertex
///
/// Undirected edges keep `source <= destination`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default = "default_group")]
    pub group: String,
    source: PropertyValue,
    destination: PropertyValue,
    directed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    matched_vertex: Option<MatchedVertex>,
    #[serde(default)]
    pub properties: Properties,
}

impl Edge {
    pub fn new(
        group: impl Into<String>,
        source: impl Into<PropertyValue>,
        destination: impl Into<PropertyValue>,
        directed: bool,
    ) -> Self {
        let mut edge = Edge {
            group: group.into(),
            source: source.into(),
            destination: destination.into(),
            directed,
            matched_vertex: None,
            properties: Properties::new(),
        };
        edge.normalise();
        edge
    }

    /// Builder-style property setter
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.put(name, value);
        self
    }

    pub fn with_matched_vertex(mut self, matched: MatchedVertex) -> Self {
        self.matched_vertex = Some(matched);
        self
    }

    pub fn source(&self) -> &PropertyValue {
        &self.source
    }

    pub fn destination(&self) -> &PropertyValue {
        &self.destination
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn matched_vertex(&self) -> Option<MatchedVertex> {
        self.matched_vertex
    }

    pub fn set_matched_vertex(&mut self, matched: Option<MatchedVertex>) {
        self.matched_vertex = matched;
    }

    /// Replace all identifiers at once, re-normalising undirected edges
    pub fn set_identifiers(
        &mut self,
        source: PropertyValue,
        destination: PropertyValue,
        directed: bool,
    ) {
        self.source = source;
        self.destination = destination;
        self.directed = directed;
        self.normalise();
    }

    /// Value of the endpoint that matched the seed, the source when unset
    pub fn matched_vertex_value(&self) -> &PropertyValue {
        match self.matched_vertex {
            Some(MatchedVertex::Destination) => &self.destination,
            _ => &self.source,
        }
    }

    /// Value of the endpoint opposite the matched one
    pub fn adjacent_matched_vertex_value(&self) -> &PropertyValue {
        match self.matched_vertex {
            Some(MatchedVertex::Destination) => &self.source,
            _ => &self.destination,
        }
    }

    fn normalise(&mut self) {
        if !self.directed && self.source > self.destination {
            std::mem::swap(&mut self.source, &mut self.destination);
            self.matched_vertex = self.matched_vertex.map(|m| match m {
                MatchedVertex::Source => MatchedVertex::Destination,
                MatchedVertex::Destination => MatchedVertex::Source,
            });
        }
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group
            && self.source == other.source
            && self.destination == other.destination
            && self.directed == other.directed
            && self.properties == other.properties
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group.hash(state);
        self.source.hash(state);
        self.destination.hash(state);
        self.directed.hash(state);
        self.properties.hash(state);
    }
}

/// A graph element: either an entity or an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum Element {
    Entity(Entity),
    Edge(Edge),
}

impl Element {
    pub fn group(&self) -> &str {
        match self {
            Element::Entity(e) => &e.group,
            Element::Edge(e) => &e.group,
        }
    }

    pub fn set_group(&mut self, group: impl Into<String>) {
        match self {
            Element::Entity(e) => e.group = group.into(),
            Element::Edge(e) => e.group = group.into(),
        }
    }

    pub fn properties(&self) -> &Properties {
        match self {
            Element::Entity(e) => &e.properties,
            Element::Edge(e) => &e.properties,
        }
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        match self {
            Element::Entity(e) => &mut e.properties,
            Element::Edge(e) => &mut e.properties,
        }
    }

    pub fn get_property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties().get(name)
    }

    pub fn put_property(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties_mut().put(name, value);
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Element::Entity(_))
    }

    pub fn is_edge(&self) -> bool {
        matches!(self, Element::Edge(_))
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Element::Edge(e) => Some(e),
            Element::Entity(_) => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Element::Entity(e) => Some(e),
            Element::Edge(_) => None,
        }
    }

    /// Clone keeping group and identifiers but no properties
    pub fn empty_clone(&self) -> Element {
        match self {
            Element::Entity(e) => Element::Entity(Entity::new(e.group.clone(), e.vertex.clone())),
            Element::Edge(e) => {
                let mut edge = Edge::new(
                    e.group.clone(),
                    e.source.clone(),
                    e.destination.clone(),
                    e.directed,
                );
                edge.matched_vertex = e.matched_vertex;
                Element::Edge(edge)
            }
        }
    }

    /// Identifier value, `Null` when the identifier does not apply
    pub fn get_identifier(&self, id: IdentifierType) -> PropertyValue {
        match (self, id) {
            (Element::Entity(e), IdentifierType::Vertex) => e.vertex.clone(),
            (Element::Edge(e), IdentifierType::Source) => e.source.clone(),
            (Element::Edge(e), IdentifierType::Destination) => e.destination.clone(),
            (Element::Edge(e), IdentifierType::Directed) => PropertyValue::Boolean(e.directed),
            (Element::Edge(e), IdentifierType::MatchedVertex) => e.matched_vertex_value().clone(),
            (Element::Edge(e), IdentifierType::AdjacentMatchedVertex) => {
                e.adjacent_matched_vertex_value().clone()
            }
            _ => PropertyValue::Null,
        }
    }

    /// Overwrite an identifier. Identifiers that do not apply are ignored.
    pub fn put_identifier(&mut self, id: IdentifierType, value: PropertyValue) {
        match (self, id) {
            (Element::Entity(e), IdentifierType::Vertex) => e.vertex = value,
            (Element::Edge(e), IdentifierType::Source) => {
                let (destination, directed) = (e.destination.clone(), e.directed);
                e.set_identifiers(value, destination, directed);
            }
            (Element::Edge(e), IdentifierType::Destination) => {
                let (source, directed) = (e.source.clone(), e.directed);
                e.set_identifiers(source, value, directed);
            }
            (Element::Edge(e), IdentifierType::Directed) => {
                let directed = value.as_boolean().unwrap_or(e.directed);
                let (source, destination) = (e.source.clone(), e.destination.clone());
                e.set_identifiers(source, destination, directed);
            }
            (Element::Edge(e), IdentifierType::MatchedVertex) => match e.matched_vertex {
                Some(MatchedVertex::Destination) => e.destination = value,
                _ => e.source = value,
            },
            (Element::Edge(e), IdentifierType::AdjacentMatchedVertex) => match e.matched_vertex {
                Some(MatchedVertex::Destination) => e.source = value,
                _ => e.destination = value,
            },
            _ => {}
        }
    }

    /// Read a named field: identifier, group, whole properties, or a property.
    /// Absent fields read as `Null`.
    pub fn get_field(&self, name: &str) -> PropertyValue {
        if name == GROUP {
            return PropertyValue::String(self.group().to_string());
        }
        if name == PROPERTIES {
            return self.properties().to_value();
        }
        if let Ok(id) = IdentifierType::from_str(name) {
            return self.get_identifier(id);
        }
        self.get_property(name).cloned().unwrap_or(PropertyValue::Null)
    }

    /// Write a named field. Writing `Null` to a property removes it.
    pub fn put_field(&mut self, name: &str, value: PropertyValue) {
        if name == GROUP {
            if let PropertyValue::String(group) = value {
                self.set_group(group);
            }
        } else if name == PROPERTIES {
            self.properties_mut().replace_from_value(value);
        } else if let Ok(id) = IdentifierType::from_str(name) {
            self.put_identifier(id, value);
        } else {
            self.put_property(name, value);
        }
    }

    /// Seed that looks this element up again
    pub fn to_seed(&self) -> ElementSeed {
        match self {
            Element::Entity(e) => ElementSeed::Entity {
                vertex: e.vertex.clone(),
            },
            Element::Edge(e) => ElementSeed::Edge {
                source: e.source.clone(),
                destination: e.destination.clone(),
                directed: e.directed,
            },
        }
    }
}

impl From<Entity> for Element {
    fn from(entity: Entity) -> Self {
        Element::Entity(entity)
    }
}

impl From<Edge> for Element {
    fn from(edge: Edge) -> Self {
        Element::Edge(edge)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Entity(e) => write!(f, "Entity[{}]({})", e.group, e.vertex)?,
            Element::Edge(e) => {
                let arrow = if e.directed { "->" } else { "-" };
                write!(f, "Edge[{}]({} {} {})", e.group, e.source, arrow, e.destination)?
            }
        }
        if !self.properties().is_empty() {
            write!(f, " {}", self.properties().to_value())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_undirected_edge_normalised() {
        let edge = Edge::new("road", "B", "A", false);
        assert_eq!(edge.source(), &PropertyValue::from("A"));
        assert_eq!(edge.destination(), &PropertyValue::from("B"));

        let directed = Edge::new("road", "B", "A", true);
        assert_eq!(directed.source(), &PropertyValue::from("B"));
    }

    #[test]
    fn test_edge_equality_ignores_matched_vertex() {
        let a = Edge::new("edge", "A", "B", true).with_property("count", 1i64);
        let b = a.clone().with_matched_vertex(MatchedVertex::Destination);
        assert_eq!(Element::from(a.clone()), Element::from(b));

        let mut set = HashSet::new();
        set.insert(Element::from(a));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_entity_and_edge_never_equal() {
        let entity: Element = Entity::new("g", "A").into();
        let edge: Element = Edge::new("g", "A", "A", true).into();
        assert_ne!(entity, edge);
    }

    #[test]
    fn test_field_access() {
        let mut element: Element = Edge::new("edge", "A", "B", true)
            .with_property("count", 3i64)
            .with_matched_vertex(MatchedVertex::Destination)
            .into();

        assert_eq!(element.get_field("GROUP"), PropertyValue::from("edge"));
        assert_eq!(element.get_field("SOURCE"), PropertyValue::from("A"));
        assert_eq!(element.get_field("MATCHED_VERTEX"), PropertyValue::from("B"));
        assert_eq!(element.get_field("ADJACENT_MATCHED_VERTEX"), PropertyValue::from("A"));
        assert_eq!(element.get_field("DIRECTED"), PropertyValue::from(true));
        assert_eq!(element.get_field("count"), PropertyValue::from(3i64));
        assert!(element.get_field("missing").is_null());
        assert!(element.get_field("VERTEX").is_null());

        element.put_field("count", PropertyValue::Null);
        assert!(element.get_property("count").is_none());

        element.put_field("DESTINATION", PropertyValue::from("C"));
        assert_eq!(element.as_edge().map(|e| e.destination().clone()), Some("C".into()));
    }

    #[test]
    fn test_empty_clone_drops_properties() {
        let element: Element = Entity::new("person", "alice")
            .with_property("age", 30i64)
            .into();
        let clone = element.empty_clone();
        assert_eq!(clone.group(), "person");
        assert!(clone.properties().is_empty());
        assert_eq!(clone.get_field("VERTEX"), PropertyValue::from("alice"));
    }

    #[test]
    fn test_element_json() {
        let element: Element = Edge::new("edge", "A", "B", true)
            .with_property("count", 8i64)
            .into();
        let json = serde_json::to_string(&element).unwrap();
        let decoded: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, element);
    }
}
