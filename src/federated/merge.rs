//! Merging constituent results
//!
//! One merge function per payload type. Inputs arrive as
//! `(graph id, payload)` pairs in declaration order.

use crate::operation::{ElementStream, GroupCounts, OperationError, OperationResult, Payload, PayloadType};
use crate::schema::Schema;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

pub type MergeFunction =
    Arc<dyn Fn(Vec<(String, Payload)>) -> OperationResult<Payload> + Send + Sync>;

/// Merge functions keyed by payload type
#[derive(Clone)]
pub struct MergeFunctions {
    functions: HashMap<PayloadType, MergeFunction>,
}

impl Default for MergeFunctions {
    fn default() -> Self {
        let mut merge = MergeFunctions::empty();
        merge.register(PayloadType::Empty, Arc::new(|_| Ok(Payload::Empty)));
        merge.register(PayloadType::Elements, Arc::new(merge_elements));
        merge.register(PayloadType::Count, Arc::new(merge_counts));
        merge.register(PayloadType::GroupCounts, Arc::new(merge_group_counts));
        merge.register(PayloadType::Strings, Arc::new(merge_strings));
        merge.register(PayloadType::Schema, Arc::new(merge_schemas));
        merge.register(PayloadType::Exports, Arc::new(merge_exports));
        merge.register(PayloadType::List, Arc::new(merge_lists));
        merge
    }
}

impl MergeFunctions {
    /// Registry with no merge functions
    pub fn empty() -> Self {
        MergeFunctions {
            functions: HashMap::new(),
        }
    }

    /// Register `function` for `payload_type`, replacing any previous one
    pub fn register(&mut self, payload_type: PayloadType, function: MergeFunction) {
        self.functions.insert(payload_type, function);
    }

    pub fn supports(&self, payload_type: PayloadType) -> bool {
        self.functions.contains_key(&payload_type)
    }

    /// Merge `results` into one payload of `output_type`.
    ///
    /// No results yield the empty value of `output_type`; a single result is
    /// returned as is. Results of differing types cannot be merged.
    pub fn merge(
        &self,
        output_type: PayloadType,
        mut results: Vec<(String, Payload)>,
    ) -> OperationResult<Payload> {
        if results.is_empty() {
            return Ok(Payload::empty_of(output_type));
        }
        if results.len() == 1 {
            if let Some((_, payload)) = results.pop() {
                return Ok(payload);
            }
        }
        let actual = results[0].1.payload_type();
        if let Some((graph_id, other)) = results.iter().find(|(_, p)| p.payload_type() != actual) {
            return Err(OperationError::Internal(format!(
                "cannot merge {} from graph '{}' with {}",
                other.payload_type(),
                graph_id,
                actual
            )));
        }
        let function = self.functions.get(&actual).ok_or_else(|| {
            OperationError::Unsupported(format!("merging {} results", actual))
        })?;
        function(results)
    }
}

fn merge_elements(results: Vec<(String, Payload)>) -> OperationResult<Payload> {
    let streams = results
        .into_iter()
        .map(|(_, payload)| payload.into_elements().unwrap_or_else(ElementStream::empty));
    Ok(Payload::Elements(ElementStream::chain(streams)))
}

fn merge_counts(results: Vec<(String, Payload)>) -> OperationResult<Payload> {
    Ok(Payload::Count(
        results.iter().filter_map(|(_, p)| p.as_count()).sum(),
    ))
}

fn merge_group_counts(results: Vec<(String, Payload)>) -> OperationResult<Payload> {
    let mut merged = GroupCounts::default();
    for (_, payload) in results {
        if let Payload::GroupCounts(counts) = payload {
            merged.limit_hit |= counts.limit_hit;
            for (group, count) in counts.counts {
                *merged.counts.entry(group).or_insert(0) += count;
            }
        }
    }
    Ok(Payload::GroupCounts(merged))
}

fn merge_strings(results: Vec<(String, Payload)>) -> OperationResult<Payload> {
    let mut merged = Vec::new();
    for (_, payload) in results {
        if let Payload::Strings(strings) = payload {
            merged.extend(strings);
        }
    }
    Ok(Payload::Strings(merged))
}

fn merge_schemas(results: Vec<(String, Payload)>) -> OperationResult<Payload> {
    let mut merged: Option<Schema> = None;
    for (_, payload) in results {
        if let Payload::Schema(schema) = payload {
            merged = Some(match merged {
                None => schema,
                Some(current) => current.merge(&schema)?,
            });
        }
    }
    Ok(Payload::Schema(merged.unwrap_or_default()))
}

fn merge_exports(results: Vec<(String, Payload)>) -> OperationResult<Payload> {
    let mut merged = IndexMap::new();
    for (_, payload) in results {
        if let Payload::Exports(exports) = payload {
            for (name, elements) in exports {
                merged.entry(name).or_insert_with(Vec::new).extend(elements);
            }
        }
    }
    Ok(Payload::Exports(merged))
}

fn merge_lists(results: Vec<(String, Payload)>) -> OperationResult<Payload> {
    let mut merged = Vec::new();
    for (_, payload) in results {
        if let Payload::List(items) = payload {
            merged.extend(items);
        }
    }
    Ok(Payload::List(merged))
}
