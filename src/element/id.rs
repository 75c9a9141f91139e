//! Identifier names and element seeds

use super::property::PropertyValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Field name that resolves to an element's group
pub const GROUP: &str = "GROUP";

/// Field name that resolves to the whole property bag as a `Map` value
pub const PROPERTIES: &str = "PROPERTIES";

/// Identifier fields addressable by name from the function pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentifierType {
    Vertex,
    Source,
    Destination,
    Directed,
    MatchedVertex,
    AdjacentMatchedVertex,
}

impl IdentifierType {
    pub const ALL: [IdentifierType; 6] = [
        IdentifierType::Vertex,
        IdentifierType::Source,
        IdentifierType::Destination,
        IdentifierType::Directed,
        IdentifierType::MatchedVertex,
        IdentifierType::AdjacentMatchedVertex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierType::Vertex => "VERTEX",
            IdentifierType::Source => "SOURCE",
            IdentifierType::Destination => "DESTINATION",
            IdentifierType::Directed => "DIRECTED",
            IdentifierType::MatchedVertex => "MATCHED_VERTEX",
            IdentifierType::AdjacentMatchedVertex => "ADJACENT_MATCHED_VERTEX",
        }
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IdentifierType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IdentifierType::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or(())
    }
}

/// Whether `name` is reserved for identifiers or pseudo-fields
pub fn is_reserved_name(name: &str) -> bool {
    name == GROUP || name == PROPERTIES || IdentifierType::from_str(name).is_ok()
}

/// Which endpoint of an edge matched a query seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchedVertex {
    Source,
    Destination,
}

/// Seed used to look elements up in a store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum ElementSeed {
    Entity {
        vertex: PropertyValue,
    },
    Edge {
        source: PropertyValue,
        destination: PropertyValue,
        directed: bool,
    },
}

impl ElementSeed {
    pub fn entity(vertex: impl Into<PropertyValue>) -> Self {
        ElementSeed::Entity {
            vertex: vertex.into(),
        }
    }

    pub fn edge(
        source: impl Into<PropertyValue>,
        destination: impl Into<PropertyValue>,
        directed: bool,
    ) -> Self {
        ElementSeed::Edge {
            source: source.into(),
            destination: destination.into(),
            directed,
        }
    }
}

impl fmt::Display for ElementSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementSeed::Entity { vertex } => write!(f, "EntitySeed({})", vertex),
            ElementSeed::Edge {
                source,
                destination,
                directed,
            } => {
                let arrow = if *directed { "->" } else { "-" };
                write!(f, "EdgeSeed({} {} {})", source, arrow, destination)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_names() {
        for id in IdentifierType::ALL {
            assert_eq!(IdentifierType::from_str(id.as_str()), Ok(id));
        }
        assert!(IdentifierType::from_str("count").is_err());
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved_name("GROUP"));
        assert!(is_reserved_name("PROPERTIES"));
        assert!(is_reserved_name("SOURCE"));
        assert!(!is_reserved_name("source"));
    }

    #[test]
    fn test_seed_json() {
        let seed = ElementSeed::edge("A", "B", true);
        let json = serde_json::to_string(&seed).unwrap();
        assert!(json.contains("\"class\":\"Edge\""));
        let decoded: ElementSeed = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, seed);
    }
}
