//! Graph element model
//!
//! Elements are entities (one vertex) or edges (source, destination and a
//! directed flag), each carrying a group and an ordered property bag.

pub mod element;
pub mod id;
pub mod property;
pub mod tuple;

pub use element::{Edge, Element, Entity, DEFAULT_GROUP};
pub use id::{is_reserved_name, ElementSeed, IdentifierType, MatchedVertex, GROUP, PROPERTIES};
pub use property::{Properties, PropertyValue};
pub use tuple::Tuple;
