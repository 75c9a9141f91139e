//! Named-field access used by the function pipeline

use super::element::Element;
use super::id::PROPERTIES;
use super::property::{Properties, PropertyValue};

/// Something the pipeline can read fields from and write fields into
pub trait Tuple {
    /// Read a field, `Null` when absent
    fn get(&self, name: &str) -> PropertyValue;

    /// Write a field, `Null` removes it where removal makes sense
    fn put(&mut self, name: &str, value: PropertyValue);

    /// Read several fields in order
    fn select(&self, names: &[String]) -> Vec<PropertyValue> {
        names.iter().map(|name| self.get(name)).collect()
    }

    /// Write values positionally into the named fields. Callers check that
    /// `values` and `names` have the same length.
    fn project(&mut self, names: &[String], values: Vec<PropertyValue>) {
        for (name, value) in names.iter().zip(values) {
            self.put(name, value);
        }
    }
}

impl Tuple for Element {
    fn get(&self, name: &str) -> PropertyValue {
        self.get_field(name)
    }

    fn put(&mut self, name: &str, value: PropertyValue) {
        self.put_field(name, value);
    }
}

impl Tuple for Properties {
    fn get(&self, name: &str) -> PropertyValue {
        if name == PROPERTIES {
            return self.to_value();
        }
        self.get(name).cloned().unwrap_or(PropertyValue::Null)
    }

    fn put(&mut self, name: &str, value: PropertyValue) {
        if name == PROPERTIES {
            self.replace_from_value(value);
        } else {
            Properties::put(self, name, value);
        }
    }
}
