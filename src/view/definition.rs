//! Per-group view definitions

use super::{ViewError, ViewResult};
use crate::element::Element;
use crate::function::{ElementAggregator, ElementFilter, ElementTransformer};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Query-time overrides for one group
///
/// Every slot is optional. An empty definition places no restriction on the
/// group: all properties are kept and nothing is filtered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewElementDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    /// Properties created by the transformer, name to value type
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub transient_properties: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_aggregation_filter: Option<ElementFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregator: Option<ElementAggregator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_aggregation_filter: Option<ElementFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer: Option<ElementTransformer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_transform_filter: Option<ElementFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_properties: Option<IndexSet<String>>,
}

impl ViewElementDefinition {
    pub fn builder() -> ViewElementDefinitionBuilder {
        ViewElementDefinitionBuilder::default()
    }

    pub fn validate(&self) -> ViewResult<()> {
        if self.properties.is_some() && self.exclude_properties.is_some() {
            return Err(ViewError::PropertiesAndExcludeProperties);
        }
        for filter in [
            &self.pre_aggregation_filter,
            &self.post_aggregation_filter,
            &self.post_transform_filter,
        ]
        .into_iter()
        .flatten()
        {
            filter.validate()?;
        }
        if let Some(aggregator) = &self.aggregator {
            aggregator.validate()?;
        }
        if let Some(transformer) = &self.transformer {
            transformer.validate()?;
        }
        Ok(())
    }

    pub fn has_post_aggregation_filters(&self) -> bool {
        self.post_aggregation_filter.as_ref().map_or(false, |f| !f.is_empty())
    }

    /// Drop properties the definition does not ask for.
    ///
    /// With `properties` set only those and the transient properties
    /// survive; with `exclude_properties` set the named ones are removed.
    pub fn remove_properties(&self, element: &mut Element) {
        if let Some(keep) = &self.properties {
            let transient = &self.transient_properties;
            element
                .properties_mut()
                .retain(|name| keep.contains(name) || transient.contains_key(name));
        } else if let Some(exclude) = &self.exclude_properties {
            element
                .properties_mut()
                .retain(|name| !exclude.contains(name));
        }
    }
}

/// Builder for [`ViewElementDefinition`]
///
/// The first conflicting call is remembered and reported by `build`.
#[derive(Debug, Default)]
pub struct ViewElementDefinitionBuilder {
    def: ViewElementDefinition,
    error: Option<ViewError>,
}

impl ViewElementDefinitionBuilder {
    pub fn group_by<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.group_by = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn transient_property(mut self, name: impl Into<String>, class: impl Into<String>) -> Self {
        self.def
            .transient_properties
            .insert(name.into(), class.into());
        self
    }

    pub fn pre_aggregation_filter(mut self, filter: ElementFilter) -> Self {
        Self::set_once(&mut self.def.pre_aggregation_filter, filter, "preAggregationFilter", &mut self.error);
        self
    }

    pub fn aggregator(mut self, aggregator: ElementAggregator) -> Self {
        Self::set_once(&mut self.def.aggregator, aggregator, "aggregator", &mut self.error);
        self
    }

    pub fn post_aggregation_filter(mut self, filter: ElementFilter) -> Self {
        Self::set_once(&mut self.def.post_aggregation_filter, filter, "postAggregationFilter", &mut self.error);
        self
    }

    pub fn transformer(mut self, transformer: ElementTransformer) -> Self {
        Self::set_once(&mut self.def.transformer, transformer, "transformer", &mut self.error);
        self
    }

    pub fn post_transform_filter(mut self, filter: ElementFilter) -> Self {
        Self::set_once(&mut self.def.post_transform_filter, filter, "postTransformFilter", &mut self.error);
        self
    }

    pub fn properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.def.exclude_properties.is_some() {
            self.fail(ViewError::PropertiesAndExcludeProperties);
        } else {
            self.def.properties = Some(names.into_iter().map(Into::into).collect());
        }
        self
    }

    pub fn exclude_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.def.properties.is_some() {
            self.fail(ViewError::PropertiesAndExcludeProperties);
        } else {
            self.def.exclude_properties = Some(names.into_iter().map(Into::into).collect());
        }
        self
    }

    pub fn build(self) -> ViewResult<ViewElementDefinition> {
        match self.error {
            Some(error) => Err(error),
            None => {
                self.def.validate()?;
                Ok(self.def)
            }
        }
    }

    fn set_once<T>(slot: &mut Option<T>, value: T, name: &'static str, error: &mut Option<ViewError>) {
        if slot.is_some() {
            error.get_or_insert(ViewError::SlotAlreadySet(name));
        } else {
            *slot = Some(value);
        }
    }

    fn fail(&mut self, error: ViewError) {
        self.error.get_or_insert(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Entity, PropertyValue};
    use crate::function::{BinaryOperator, Predicate};

    #[test]
    fn test_build_definition() {
        let def = ViewElementDefinition::builder()
            .transient_property("prop1", "String")
            .properties(["count", "date"])
            .pre_aggregation_filter(
                ElementFilter::builder()
                    .select(["count"])
                    .execute(Predicate::is_more_than(5i64))
                    .build(),
            )
            .aggregator(
                ElementAggregator::builder()
                    .select(["count"])
                    .execute(BinaryOperator::Max)
                    .build(),
            )
            .build()
            .unwrap();

        assert_eq!(def.transient_properties.len(), 1);
        assert!(def.exclude_properties.is_none());
        assert_eq!(def.properties.as_ref().map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_properties_then_exclude_fails() {
        let result = ViewElementDefinition::builder()
            .properties(["prop1"])
            .exclude_properties(["prop1"])
            .build();
        let error = result.unwrap_err();
        assert_eq!(error, ViewError::PropertiesAndExcludeProperties);
        assert_eq!(
            error.to_string(),
            "You cannot set both properties and excludeProperties"
        );

        let result = ViewElementDefinition::builder()
            .exclude_properties(["prop1"])
            .properties(["prop1"])
            .build();
        assert_eq!(result, Err(ViewError::PropertiesAndExcludeProperties));
    }

    #[test]
    fn test_slot_set_twice_fails() {
        let filter = ElementFilter::builder()
            .select(["count"])
            .execute(Predicate::Exists)
            .build();
        for result in [
            ViewElementDefinition::builder()
                .pre_aggregation_filter(filter.clone())
                .pre_aggregation_filter(filter.clone())
                .build(),
            ViewElementDefinition::builder()
                .post_aggregation_filter(filter.clone())
                .post_aggregation_filter(filter.clone())
                .build(),
            ViewElementDefinition::builder()
                .post_transform_filter(filter.clone())
                .post_transform_filter(filter.clone())
                .build(),
        ] {
            assert!(matches!(result, Err(ViewError::SlotAlreadySet(_))));
        }
    }

    #[test]
    fn test_decoded_definition_with_both_is_invalid() {
        let json = r#"{"properties":["a"],"excludeProperties":["b"]}"#;
        let def: ViewElementDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.validate(), Err(ViewError::PropertiesAndExcludeProperties));
    }

    #[test]
    fn test_remove_properties() {
        let mut element: Element = Entity::new("e", "v")
            .with_property("a", 1i64)
            .with_property("b", 2i64)
            .with_property("t", 3i64)
            .into();

        let keep = ViewElementDefinition::builder()
            .properties(["a"])
            .transient_property("t", "Integer")
            .build()
            .unwrap();
        let mut kept = element.clone();
        keep.remove_properties(&mut kept);
        assert_eq!(kept.properties().len(), 2);
        assert!(kept.get_property("b").is_none());

        let exclude = ViewElementDefinition::builder()
            .exclude_properties(["a"])
            .build()
            .unwrap();
        exclude.remove_properties(&mut element);
        assert!(element.get_property("a").is_none());
        assert_eq!(element.get_property("b"), Some(&PropertyValue::from(2i64)));
    }
}
