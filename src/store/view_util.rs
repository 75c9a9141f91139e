//! View application for store reads
//!
//! Group selection, pre-aggregation filter, query aggregation,
//! post-aggregation filter, transformer, post-transform filter and finally
//! property removal.

use crate::aggregation::query_aggregate;
use crate::element::Element;
use crate::operation::OperationResult;
use crate::schema::Schema;
use crate::view::View;
use tracing::debug;

pub fn apply_view(
    elements: Vec<Element>,
    schema: &Schema,
    view: &View,
    include_matched_vertex: bool,
) -> OperationResult<Vec<Element>> {
    let read = elements.len();
    let mut selected = Vec::with_capacity(read);
    for element in elements {
        if !view.includes_group(element.group()) {
            continue;
        }
        let def = view.get_element(element.group());
        if let Some(filter) = &def.pre_aggregation_filter {
            if !filter.test(&element)? {
                continue;
            }
        }
        selected.push(element);
    }

    let aggregated = query_aggregate(selected, schema, view, include_matched_vertex)?;

    let mut output = Vec::with_capacity(aggregated.len());
    for mut element in aggregated {
        let def = view.get_element(element.group());
        if let Some(filter) = &def.post_aggregation_filter {
            if !filter.test(&element)? {
                continue;
            }
        }
        if let Some(transformer) = &def.transformer {
            transformer.apply(&mut element)?;
        }
        if let Some(filter) = &def.post_transform_filter {
            if !filter.test(&element)? {
                continue;
            }
        }
        def.remove_properties(&mut element);
        output.push(element);
    }
    debug!(read, returned = output.len(), "applied view");
    Ok(output)
}
