//! Functions bound to named input and output fields

use serde::{Deserialize, Serialize};

/// A function bound to a `selection` of input fields and a `projection` of
/// output fields. An empty projection means the selection is projected to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleAdapted<F> {
    pub selection: Vec<String>,
    pub function: F,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projection: Vec<String>,
}

impl<F> TupleAdapted<F> {
    /// Component that writes back to the fields it reads
    pub fn new(selection: Vec<String>, function: F) -> Self {
        TupleAdapted {
            selection,
            function,
            projection: Vec::new(),
        }
    }

    pub fn with_projection(mut self, projection: Vec<String>) -> Self {
        self.projection = projection;
        self
    }

    /// Fields results are written to
    pub fn effective_projection(&self) -> &[String] {
        if self.projection.is_empty() {
            &self.selection
        } else {
            &self.projection
        }
    }
}

pub(crate) fn to_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_projection_is_selection() {
        let adapted = TupleAdapted::new(vec!["a".to_string()], ());
        assert_eq!(adapted.effective_projection(), &["a".to_string()]);

        let adapted = adapted.with_projection(vec!["b".to_string()]);
        assert_eq!(adapted.effective_projection(), &["b".to_string()]);
    }
}
