//! Engine configuration
//!
//! Loaded from YAML, then overridden from the environment:
//! `GRAPHWEAVE_FAILURE_POLICY`, `GRAPHWEAVE_MAX_CONCURRENCY` and
//! `GRAPHWEAVE_LOG`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub const ENV_FAILURE_POLICY: &str = "GRAPHWEAVE_FAILURE_POLICY";
pub const ENV_MAX_CONCURRENCY: &str = "GRAPHWEAVE_MAX_CONCURRENCY";
pub const ENV_LOG: &str = "GRAPHWEAVE_LOG";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Environment override with an unusable value
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// What a federated call does when a constituent graph fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Cancel outstanding graphs and return the first error
    #[default]
    FailFast,
    /// Record the failure and merge the surviving results
    SkipFailures,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_fast" | "fail-fast" => Ok(FailurePolicy::FailFast),
            "skip_failures" | "skip-failures" => Ok(FailurePolicy::SkipFailures),
            _ => Err(ConfigError::InvalidValue {
                key: ENV_FAILURE_POLICY.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::FailFast => write!(f, "fail_fast"),
            FailurePolicy::SkipFailures => write!(f, "skip_failures"),
        }
    }
}

/// Federated execution settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FederatedConfig {
    pub failure_policy: FailurePolicy,
    /// Constituent calls in flight at once; unbounded when unset
    pub max_concurrency: Option<usize>,
    /// Graphs used when an operation names none; all graphs when empty
    pub default_graph_ids: Vec<String>,
}

impl FederatedConfig {
    /// Reject settings a federated store cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrency == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "federated.max_concurrency".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `tracing_subscriber` filter directive
    pub log_filter: String,
    pub federated: FederatedConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            federated: FederatedConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.federated.validate()?;
        Ok(config)
    }

    /// Load from a YAML file and apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut config = Self::from_yaml_str(&text)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(policy) = lookup(ENV_FAILURE_POLICY) {
            self.federated.failure_policy = policy.parse()?;
        }
        if let Some(value) = lookup(ENV_MAX_CONCURRENCY) {
            let parsed = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: ENV_MAX_CONCURRENCY.to_string(),
                    value: value.clone(),
                })?;
            self.federated.max_concurrency = Some(parsed);
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        Ok(())
    }
}
