//! Element reads

use super::payload::{Payload, PayloadType};
use super::{Operation, OperationResult, Options, GET_FAMILY, OPERATION_FAMILY, OUTPUT_FAMILY};
use crate::element::{Edge, Element, ElementSeed, MatchedVertex, PropertyValue};
use crate::view::View;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

/// Which edges a read returns by directedness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectedType {
    #[default]
    Either,
    Directed,
    Undirected,
}

impl DirectedType {
    pub fn accepts(self, directed: bool) -> bool {
        match self {
            DirectedType::Either => true,
            DirectedType::Directed => directed,
            DirectedType::Undirected => !directed,
        }
    }
}

/// How seeds match elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeedMatching {
    /// Entity seeds also return their edges, edge seeds their endpoint entities
    #[default]
    Related,
    /// Only elements with exactly the seed's identifiers
    Equal,
}

/// Which directed edges a vertex seed returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncludeIncomingOutgoing {
    #[default]
    Either,
    Incoming,
    Outgoing,
}

/// Elements related to a set of seeds
#[derive(Debug, Clone, Default)]
pub struct GetElements {
    pub input: Arc<Vec<ElementSeed>>,
    pub view: Option<View>,
    pub seed_matching: SeedMatching,
    pub include_incoming_outgoing: IncludeIncomingOutgoing,
    pub directed_type: DirectedType,
    pub options: Options,
}

impl GetElements {
    pub fn new(seeds: Vec<ElementSeed>) -> Self {
        GetElements {
            input: Arc::new(seeds),
            ..Default::default()
        }
    }

    pub fn with_view(mut self, view: View) -> Self {
        self.view = Some(view);
        self
    }

    pub fn with_seed_matching(mut self, seed_matching: SeedMatching) -> Self {
        self.seed_matching = seed_matching;
        self
    }

    pub fn with_include_incoming_outgoing(mut self, inout: IncludeIncomingOutgoing) -> Self {
        self.include_incoming_outgoing = inout;
        self
    }

    pub fn with_directed_type(mut self, directed_type: DirectedType) -> Self {
        self.directed_type = directed_type;
        self
    }

    /// Copy of `element` if it matches `seed`. Edges matched through a vertex
    /// seed record which endpoint matched.
    pub fn matches(&self, seed: &ElementSeed, element: &Element) -> Option<Element> {
        match (seed, element) {
            (ElementSeed::Entity { vertex }, Element::Entity(entity)) => {
                (entity.vertex == *vertex).then(|| element.clone())
            }
            (ElementSeed::Entity { vertex }, Element::Edge(edge)) => {
                if self.seed_matching == SeedMatching::Equal {
                    return None;
                }
                let matched = self.matched_endpoint(vertex, edge)?;
                let mut edge = edge.clone();
                edge.set_matched_vertex(Some(matched));
                Some(Element::Edge(edge))
            }
            (
                ElementSeed::Edge {
                    source,
                    destination,
                    directed,
                },
                Element::Edge(edge),
            ) => {
                let same_direction = edge.is_directed() == *directed;
                let forward = edge.source() == source && edge.destination() == destination;
                let reverse =
                    !*directed && edge.source() == destination && edge.destination() == source;
                (same_direction && (forward || reverse) && self.directed_type.accepts(edge.is_directed()))
                    .then(|| element.clone())
            }
            (ElementSeed::Edge {
                source,
                destination,
                ..
            }, Element::Entity(entity)) => {
                (self.seed_matching == SeedMatching::Related
                    && (entity.vertex == *source || entity.vertex == *destination))
                    .then(|| element.clone())
            }
        }
    }

    fn matched_endpoint(&self, vertex: &PropertyValue, edge: &Edge) -> Option<MatchedVertex> {
        if !self.directed_type.accepts(edge.is_directed()) {
            return None;
        }
        let at_source = edge.source() == vertex;
        let at_destination = edge.destination() == vertex;
        if !edge.is_directed() {
            return if at_source {
                Some(MatchedVertex::Source)
            } else if at_destination {
                Some(MatchedVertex::Destination)
            } else {
                None
            };
        }
        match self.include_incoming_outgoing {
            IncludeIncomingOutgoing::Outgoing => at_source.then_some(MatchedVertex::Source),
            IncludeIncomingOutgoing::Incoming => at_destination.then_some(MatchedVertex::Destination),
            IncludeIncomingOutgoing::Either if at_source => Some(MatchedVertex::Source),
            IncludeIncomingOutgoing::Either => at_destination.then_some(MatchedVertex::Destination),
        }
    }
}

impl Operation for GetElements {
    fn class(&self) -> &'static str {
        "GetElements"
    }

    fn lineage(&self) -> Vec<&'static str> {
        vec![self.class(), GET_FAMILY, OUTPUT_FAMILY, OPERATION_FAMILY]
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn input_type(&self) -> PayloadType {
        PayloadType::Seeds
    }

    fn output_type(&self) -> PayloadType {
        PayloadType::Elements
    }

    fn accepts_input(&self, output: PayloadType) -> bool {
        matches!(
            output,
            PayloadType::Seeds | PayloadType::Elements | PayloadType::Empty | PayloadType::Any
        )
    }

    fn set_input(&mut self, input: Payload) -> OperationResult<()> {
        match input {
            Payload::Seeds(seeds) => {
                self.input = Arc::new(seeds);
                Ok(())
            }
            Payload::Elements(stream) => {
                let elements = stream.collect_all()?;
                self.input = Arc::new(elements.iter().map(Element::to_seed).collect());
                Ok(())
            }
            other => Err(self.invalid_input(&other)),
        }
    }

    fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    fn set_view(&mut self, view: View) {
        self.view = Some(view);
    }

    fn shallow_clone(&self) -> Box<dyn Operation> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Every element in the graph
#[derive(Debug, Clone, Default)]
pub struct GetAllElements {
    pub view: Option<View>,
    pub directed_type: DirectedType,
    pub options: Options,
}

impl GetAllElements {
    pub fn new() -> Self {
        GetAllElements::default()
    }

    pub fn with_view(mut self, view: View) -> Self {
        self.view = Some(view);
        self
    }

    pub fn with_directed_type(mut self, directed_type: DirectedType) -> Self {
        self.directed_type = directed_type;
        self
    }

    pub fn accepts(&self, element: &Element) -> bool {
        element
            .as_edge()
            .map_or(true, |edge| self.directed_type.accepts(edge.is_directed()))
    }
}

impl Operation for GetAllElements {
    fn class(&self) -> &'static str {
        "GetAllElements"
    }

    fn lineage(&self) -> Vec<&'static str> {
        vec![self.class(), GET_FAMILY, OUTPUT_FAMILY, OPERATION_FAMILY]
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn output_type(&self) -> PayloadType {
        PayloadType::Elements
    }

    fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    fn set_view(&mut self, view: View) {
        self.view = Some(view);
    }

    fn shallow_clone(&self) -> Box<dyn Operation> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Entity;

    fn edge(src: &str, dst: &str, directed: bool) -> Element {
        Edge::new("edge", src, dst, directed).into()
    }

    #[test]
    fn test_vertex_seed_matches_entity_and_edges() {
        let op = GetElements::new(vec![]);
        let seed = ElementSeed::entity("A");

        let entity: Element = Entity::new("entity", "A").into();
        assert_eq!(op.matches(&seed, &entity), Some(entity.clone()));

        let matched = op.matches(&seed, &edge("B", "A", true)).unwrap();
        assert_eq!(
            matched.as_edge().and_then(Edge::matched_vertex),
            Some(MatchedVertex::Destination)
        );
        assert!(op.matches(&seed, &edge("B", "C", true)).is_none());
    }

    #[test]
    fn test_incoming_outgoing() {
        let seed = ElementSeed::entity("A");
        let outgoing = GetElements::new(vec![])
            .with_include_incoming_outgoing(IncludeIncomingOutgoing::Outgoing);
        assert!(outgoing.matches(&seed, &edge("A", "B", true)).is_some());
        assert!(outgoing.matches(&seed, &edge("B", "A", true)).is_none());
        // undirected edges match either way
        assert!(outgoing.matches(&seed, &edge("B", "A", false)).is_some());

        let incoming = GetElements::new(vec![])
            .with_include_incoming_outgoing(IncludeIncomingOutgoing::Incoming);
        assert!(incoming.matches(&seed, &edge("B", "A", true)).is_some());
    }

    #[test]
    fn test_equal_matching() {
        let op = GetElements::new(vec![]).with_seed_matching(SeedMatching::Equal);
        assert!(op.matches(&ElementSeed::entity("A"), &edge("A", "B", true)).is_none());
        assert!(op
            .matches(&ElementSeed::edge("A", "B", true), &edge("A", "B", true))
            .is_some());
        assert!(op
            .matches(&ElementSeed::edge("B", "A", false), &edge("A", "B", false))
            .is_some());
        assert!(op
            .matches(&ElementSeed::edge("B", "A", true), &edge("A", "B", true))
            .is_none());
    }

    #[test]
    fn test_directed_type() {
        let op = GetAllElements::new().with_directed_type(DirectedType::Undirected);
        assert!(!op.accepts(&edge("A", "B", true)));
        assert!(op.accepts(&edge("A", "B", false)));
        assert!(op.accepts(&Entity::new("entity", "A").into()));
    }

    #[test]
    fn test_elements_input_becomes_seeds() {
        let mut op = GetElements::new(vec![]);
        op.set_input(Payload::from(vec![edge("A", "B", true)])).unwrap();
        assert_eq!(*op.input, vec![ElementSeed::edge("A", "B", true)]);
        assert!(op.set_input(Payload::Count(1)).is_err());
    }
}
