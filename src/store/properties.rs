//! Store properties
//!
//! A flat string map describing how to build a store. `store_class` picks
//! the backend.

use crate::config::{ConfigError, ConfigResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const STORE_CLASS: &str = "store_class";

/// Backend key of the in-memory store
pub const MEMORY_STORE_CLASS: &str = "memory";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreProperties(IndexMap<String, String>);

impl StoreProperties {
    pub fn new() -> Self {
        StoreProperties::default()
    }

    /// Properties selecting the in-memory backend
    pub fn memory() -> Self {
        StoreProperties::new().with(STORE_CLASS, MEMORY_STORE_CLASS)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn store_class(&self) -> Option<&str> {
        self.get(STORE_CLASS)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        StoreProperties::from_yaml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml() {
        let props = StoreProperties::from_yaml_str("store_class: memory\njob_tracker: \"false\"\n").unwrap();
        assert_eq!(props.store_class(), Some(MEMORY_STORE_CLASS));
        assert_eq!(props.get("job_tracker"), Some("false"));
        assert_eq!(props, StoreProperties::memory().with("job_tracker", "false"));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            StoreProperties::from_yaml_str("- not\n- a map\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
