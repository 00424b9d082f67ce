//! # Operator Configuration
//!
//! The three settings an operator can change on the workload.

use crate::constants::{DEFAULT_ACCESS_KEY, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors raised while reading or coercing operator configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("port value '{0}' is not a valid integer")]
    InvalidPort(String),
    #[error("failed to parse operator configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// A port as configured: either a number or a numeric string
///
/// The value is published to relation consumers exactly as configured and only
/// coerced to an integer when it becomes a container port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

impl PortValue {
    /// Coerce the configured value to a container port number
    pub fn as_container_port(&self) -> Result<i32, ConfigError> {
        match self {
            PortValue::Number(n) => {
                i32::try_from(*n).map_err(|_| ConfigError::InvalidPort(n.to_string()))
            }
            PortValue::Text(s) => s
                .trim()
                .parse::<i32>()
                .map_err(|_| ConfigError::InvalidPort(s.clone())),
        }
    }
}

impl Default for PortValue {
    fn default() -> Self {
        PortValue::Number(DEFAULT_PORT)
    }
}

impl fmt::Display for PortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortValue::Number(n) => write!(f, "{n}"),
            PortValue::Text(s) => f.write_str(s),
        }
    }
}

/// Workload configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OperatorConfig {
    /// Access key exposed to the workload and to consumers
    #[serde(default = "default_access_key")]
    pub access_key: String,
    /// Secret key override; empty means "use the generated secret"
    #[serde(default)]
    pub secret_key: String,
    /// Port the object-storage server listens on
    #[serde(default)]
    pub port: PortValue,
}

fn default_access_key() -> String {
    DEFAULT_ACCESS_KEY.to_string()
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            access_key: default_access_key(),
            secret_key: String::new(),
            port: PortValue::default(),
        }
    }
}

impl OperatorConfig {
    /// Parse configuration from a YAML (or JSON) document
    pub fn from_yaml(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(input)?)
    }

    /// Build configuration from flat string key/value pairs (e.g. ConfigMap data)
    ///
    /// Absent keys fall back to their defaults. `port` stays a string so it is
    /// republished verbatim.
    pub fn from_string_map(data: &BTreeMap<String, String>) -> Self {
        let defaults = Self::default();
        Self {
            access_key: data
                .get("access-key")
                .cloned()
                .unwrap_or(defaults.access_key),
            secret_key: data
                .get("secret-key")
                .cloned()
                .unwrap_or(defaults.secret_key),
            port: data
                .get("port")
                .map(|p| PortValue::Text(p.clone()))
                .unwrap_or(defaults.port),
        }
    }

    /// The secret key the workload should use: the configured override when
    /// non-empty, the persisted generated secret otherwise
    pub fn effective_secret_key<'a>(&'a self, generated: &'a str) -> &'a str {
        if self.secret_key.is_empty() {
            generated
        } else {
            &self.secret_key
        }
    }
}
