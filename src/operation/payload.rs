//! Values passed between operations

use super::stream::ElementStream;
use crate::element::{Element, ElementSeed};
use crate::schema::Schema;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of an operation's input or output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadType {
    /// No value
    Empty,
    Elements,
    Seeds,
    Count,
    /// Group name to count
    GroupCounts,
    Strings,
    Schema,
    /// Export name to exported elements
    Exports,
    List,
    /// Accepts or produces any shape
    Any,
}

impl PayloadType {
    /// Whether a value of shape `self` can feed an input of shape `input`
    pub fn feeds(self, input: PayloadType) -> bool {
        self == input || self == PayloadType::Any || input == PayloadType::Any
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A value flowing into or out of an operation
#[derive(Debug)]
pub enum Payload {
    Empty,
    Elements(ElementStream),
    Seeds(Vec<ElementSeed>),
    Count(u64),
    GroupCounts(GroupCounts),
    Strings(Vec<String>),
    Schema(Schema),
    Exports(IndexMap<String, Vec<Element>>),
    List(Vec<Payload>),
}

/// Counts per group, flagged when counting stopped at a limit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCounts {
    pub counts: IndexMap<String, u64>,
    pub limit_hit: bool,
}

impl GroupCounts {
    pub fn increment(&mut self, group: &str) {
        *self.counts.entry(group.to_string()).or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

impl Payload {
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Payload::Empty => PayloadType::Empty,
            Payload::Elements(_) => PayloadType::Elements,
            Payload::Seeds(_) => PayloadType::Seeds,
            Payload::Count(_) => PayloadType::Count,
            Payload::GroupCounts(_) => PayloadType::GroupCounts,
            Payload::Strings(_) => PayloadType::Strings,
            Payload::Schema(_) => PayloadType::Schema,
            Payload::Exports(_) => PayloadType::Exports,
            Payload::List(_) => PayloadType::List,
        }
    }

    /// Empty value of the given shape
    pub fn empty_of(payload_type: PayloadType) -> Payload {
        match payload_type {
            PayloadType::Elements => Payload::Elements(ElementStream::empty()),
            PayloadType::Seeds => Payload::Seeds(Vec::new()),
            PayloadType::Count => Payload::Count(0),
            PayloadType::GroupCounts => Payload::GroupCounts(GroupCounts::default()),
            PayloadType::Strings => Payload::Strings(Vec::new()),
            PayloadType::Schema => Payload::Schema(Schema::default()),
            PayloadType::Exports => Payload::Exports(IndexMap::new()),
            PayloadType::List => Payload::List(Vec::new()),
            PayloadType::Empty | PayloadType::Any => Payload::Empty,
        }
    }

    pub fn into_elements(self) -> Option<ElementStream> {
        match self {
            Payload::Elements(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            Payload::Count(count) => Some(*count),
            _ => None,
        }
    }
}

impl From<ElementStream> for Payload {
    fn from(stream: ElementStream) -> Self {
        Payload::Elements(stream)
    }
}

impl From<Vec<Element>> for Payload {
    fn from(elements: Vec<Element>) -> Self {
        Payload::Elements(ElementStream::from_vec(elements))
    }
}

impl From<Vec<ElementSeed>> for Payload {
    fn from(seeds: Vec<ElementSeed>) -> Self {
        Payload::Seeds(seeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feeds() {
        assert!(PayloadType::Elements.feeds(PayloadType::Elements));
        assert!(PayloadType::Any.feeds(PayloadType::Count));
        assert!(PayloadType::Elements.feeds(PayloadType::Any));
        assert!(!PayloadType::Count.feeds(PayloadType::Elements));
    }

    #[test]
    fn test_empty_of_matches_type() {
        for payload_type in [
            PayloadType::Elements,
            PayloadType::Seeds,
            PayloadType::Count,
            PayloadType::GroupCounts,
            PayloadType::Strings,
            PayloadType::Schema,
            PayloadType::Exports,
            PayloadType::List,
            PayloadType::Empty,
        ] {
            assert_eq!(Payload::empty_of(payload_type).payload_type(), payload_type);
        }
    }
}
