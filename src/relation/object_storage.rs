//! The record published over the `object-storage` relation.

use crate::config::PortValue;
use serde::{Deserialize, Serialize};

/// Connection parameters a consumer needs to reach the object store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ObjectStorageData {
    pub access_key: String,
    /// Model (namespace) the service lives in
    pub namespace: String,
    /// Port exactly as configured
    pub port: PortValue,
    pub secret_key: String,
    pub secure: bool,
    /// Application (service) name
    pub service: String,
}

impl ObjectStorageData {
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
