//! # ConfigMap Relation Bus
//!
//! Relation data exchanged through `ConfigMap`s and `Secret`s.
//!
//! Each consumer publishes a config map labelled
//! `minio.operator/relation=<relation>` and `minio.operator/app=<consumer>`,
//! listing the schema versions it speaks under `_supported_versions` (a YAML
//! list). This side advertises its own `_supported_versions` in the
//! `<app>-<relation>` config map. The serialized record carries credentials, so
//! it goes under `data` in the `<app>-<relation>` secret instead.

use super::owned_labels;
use crate::config::ControllerConfig;
use crate::constants::{
    FIELD_MANAGER, LABEL_APP, LABEL_RELATION, RELATION_DATA_KEY, SUPPORTED_VERSIONS_KEY,
};
use crate::relation::{RelatedApp, RelationBus, RelationError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::ByteString;
use kube::api::{Api, ListParams, ObjectMeta, Patch, PatchParams};
use kube::Client;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub struct ConfigMapRelationBus {
    config_maps: Api<ConfigMap>,
    secrets: Api<Secret>,
    config: ControllerConfig,
}

impl std::fmt::Debug for ConfigMapRelationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigMapRelationBus")
            .field("namespace", &self.config.namespace)
            .finish_non_exhaustive()
    }
}

impl ConfigMapRelationBus {
    pub fn new(client: Client, config: &ControllerConfig) -> Self {
        Self {
            config_maps: Api::namespaced(client.clone(), &config.namespace),
            secrets: Api::namespaced(client, &config.namespace),
            config: config.clone(),
        }
    }
}

/// This side's advertised versions for `relation`
pub(crate) fn versions_config_map(
    name: &str,
    app_name: &str,
    versions: &[String],
) -> Result<ConfigMap, RelationError> {
    Ok(ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(owned_labels(app_name)),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            SUPPORTED_VERSIONS_KEY.to_string(),
            serde_yaml::to_string(versions)?,
        )])),
        ..Default::default()
    })
}

/// The serialized relation record, kept out of config maps
pub(crate) fn relation_data_secret(name: &str, app_name: &str, data: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(owned_labels(app_name)),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(BTreeMap::from([(
            RELATION_DATA_KEY.to_string(),
            ByteString(data.as_bytes().to_vec()),
        )])),
        ..Default::default()
    }
}

/// Selector for the consumer config maps of `relation`
pub(crate) fn relation_selector(relation: &str) -> String {
    format!("{LABEL_RELATION}={relation}")
}

/// Read a consumer config map into a [`RelatedApp`]
///
/// The app name comes from the `minio.operator/app` label, falling back to the
/// config map name. Unparseable version lists are treated as not advertised.
pub(crate) fn related_app_from(config_map: &ConfigMap) -> Option<RelatedApp> {
    let name = config_map
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(LABEL_APP))
        .or(config_map.metadata.name.as_ref())?
        .clone();

    let supported_versions = config_map
        .data
        .as_ref()
        .and_then(|data| data.get(SUPPORTED_VERSIONS_KEY))
        .and_then(|raw| match serde_yaml::from_str::<Vec<String>>(raw) {
            Ok(versions) => Some(versions),
            Err(e) => {
                warn!(app = %name, error = %e, "Ignoring malformed {}", SUPPORTED_VERSIONS_KEY);
                None
            }
        });

    Some(RelatedApp {
        name,
        supported_versions,
    })
}

#[async_trait]
impl RelationBus for ConfigMapRelationBus {
    async fn related_apps(&self, relation: &str) -> Result<Vec<RelatedApp>, RelationError> {
        let list = self
            .config_maps
            .list(&ListParams::default().labels(&relation_selector(relation)))
            .await?;
        let mut apps: Vec<RelatedApp> = list.items.iter().filter_map(related_app_from).collect();
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(apps)
    }

    async fn advertise_versions(
        &self,
        relation: &str,
        versions: &[String],
    ) -> Result<(), RelationError> {
        let name = self.config.relation_config_map_name(relation);
        let config_map = versions_config_map(&name, &self.config.app_name, versions)?;
        self.config_maps
            .patch(&name, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&config_map))
            .await?;
        debug!(config_map = %name, "Advertised relation versions");
        Ok(())
    }

    async fn write_data(&self, relation: &str, data: &str) -> Result<(), RelationError> {
        let name = self.config.relation_config_map_name(relation);
        let secret = relation_data_secret(&name, &self.config.app_name, data);
        self.secrets
            .patch(&name, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&secret))
            .await?;
        debug!(secret = %name, "Relation data applied");
        Ok(())
    }
}
