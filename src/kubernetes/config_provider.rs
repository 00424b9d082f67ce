//! # ConfigMap Config Provider
//!
//! Reads the operator configuration from the `<app>-config` `ConfigMap`.
//! A missing config map yields the defaults.

use super::is_not_found;
use crate::config::{ControllerConfig, OperatorConfig};
use crate::host::{ConfigProvider, HostError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::Api;
use kube::Client;
use tracing::debug;

pub struct ConfigMapConfigProvider {
    config_maps: Api<ConfigMap>,
    name: String,
}

impl std::fmt::Debug for ConfigMapConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigMapConfigProvider")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ConfigMapConfigProvider {
    pub fn new(client: Client, config: &ControllerConfig) -> Self {
        Self {
            config_maps: Api::namespaced(client, &config.namespace),
            name: config.config_map_name(),
        }
    }
}

#[async_trait]
impl ConfigProvider for ConfigMapConfigProvider {
    async fn config(&self) -> Result<OperatorConfig, HostError> {
        match self.config_maps.get(&self.name).await {
            Ok(config_map) => Ok(OperatorConfig::from_string_map(
                &config_map.data.unwrap_or_default(),
            )),
            Err(e) if is_not_found(&e) => {
                debug!(config_map = %self.name, "Config map not found, using defaults");
                Ok(OperatorConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}
