//! # ConfigMap Status Sink
//!
//! Mirrors each replica's status into the `<app>-operator-status` `ConfigMap`.
//!
//! Every pod owns its own keys (`<pod>.status`, `<pod>.message`,
//! `<pod>.lastTransitionTime`) under its own field manager, so a follower
//! reporting `active` never overwrites the leader's `blocked` or `waiting`.
//! The transition time only moves when the status kind changes.

use super::{is_not_found, owned_labels};
use crate::config::ControllerConfig;
use crate::constants::FIELD_MANAGER;
use crate::host::{ControllerStatus, HostError, StatusSink};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, ObjectMeta, Patch, PatchParams};
use kube::Client;
use std::collections::BTreeMap;
use tracing::debug;

pub struct ConfigMapStatusSink {
    config_maps: Api<ConfigMap>,
    name: String,
    app_name: String,
    pod_name: String,
}

impl std::fmt::Debug for ConfigMapStatusSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigMapStatusSink")
            .field("name", &self.name)
            .field("pod_name", &self.pod_name)
            .finish_non_exhaustive()
    }
}

impl ConfigMapStatusSink {
    pub fn new(client: Client, config: &ControllerConfig) -> Self {
        Self {
            config_maps: Api::namespaced(client, &config.namespace),
            name: config.status_config_map_name(),
            app_name: config.app_name.clone(),
            pod_name: config.pod_name.clone(),
        }
    }

    async fn current_data(&self) -> Result<BTreeMap<String, String>, kube::Error> {
        match self.config_maps.get(&self.name).await {
            Ok(config_map) => Ok(config_map.data.unwrap_or_default()),
            Err(e) if is_not_found(&e) => Ok(BTreeMap::new()),
            Err(e) => Err(e),
        }
    }
}

fn status_key(pod_name: &str, field: &str) -> String {
    format!("{pod_name}.{field}")
}

/// The keys `pod_name` owns for `status`
///
/// `previous` is the current config map data; the previous transition time is
/// kept when the status kind is unchanged. `message` is empty for `Active`.
pub fn status_entries(
    pod_name: &str,
    status: &ControllerStatus,
    previous: &BTreeMap<String, String>,
    now: DateTime<Utc>,
) -> BTreeMap<String, String> {
    let kind = status.kind().as_str();
    let status_key_name = status_key(pod_name, "status");
    let time_key = status_key(pod_name, "lastTransitionTime");

    let transition_time = match (previous.get(&status_key_name), previous.get(&time_key)) {
        (Some(previous_kind), Some(previous_time)) if previous_kind == kind => {
            previous_time.clone()
        }
        _ => now.to_rfc3339(),
    };

    BTreeMap::from([
        (status_key_name, kind.to_string()),
        (
            status_key(pod_name, "message"),
            status.message().unwrap_or_default().to_string(),
        ),
        (time_key, transition_time),
    ])
}

/// Render the slice of the status config map owned by `pod_name`
pub fn render_status_config_map(
    name: &str,
    app_name: &str,
    pod_name: &str,
    status: &ControllerStatus,
    previous: &BTreeMap<String, String>,
    now: DateTime<Utc>,
) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(owned_labels(app_name)),
            ..Default::default()
        },
        data: Some(status_entries(pod_name, status, previous, now)),
        ..Default::default()
    }
}

#[async_trait]
impl StatusSink for ConfigMapStatusSink {
    async fn set_status(&self, status: &ControllerStatus) -> Result<(), HostError> {
        let previous = self.current_data().await?;
        let config_map = render_status_config_map(
            &self.name,
            &self.app_name,
            &self.pod_name,
            status,
            &previous,
            Utc::now(),
        );
        let manager = format!("{FIELD_MANAGER}.{}", self.pod_name);
        self.config_maps
            .patch(&self.name, &PatchParams::apply(&manager).force(), &Patch::Apply(&config_map))
            .await?;
        debug!(status = %status, pod = %self.pod_name, "Status updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(timestamp: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(timestamp)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_render_blocked_status() {
        let cm = render_status_config_map(
            "minio-operator-status",
            "minio",
            "minio-operator-0",
            &ControllerStatus::Blocked("Missing resource: oci-image".to_string()),
            &BTreeMap::new(),
            at("2024-05-01T12:00:00Z"),
        );
        let data = cm.data.unwrap();
        assert_eq!(data["minio-operator-0.status"], "blocked");
        assert_eq!(data["minio-operator-0.message"], "Missing resource: oci-image");
        assert_eq!(
            data["minio-operator-0.lastTransitionTime"],
            "2024-05-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_active_status_has_empty_message() {
        let data = status_entries("p", &ControllerStatus::Active, &BTreeMap::new(), Utc::now());
        assert_eq!(data["p.message"], "");
    }

    #[test]
    fn test_follower_keys_do_not_touch_leader_keys() {
        let leader = status_entries(
            "minio-operator-0",
            &ControllerStatus::Blocked("Missing resource: oci-image".to_string()),
            &BTreeMap::new(),
            at("2024-05-01T12:00:00Z"),
        );
        let mut merged = leader.clone();
        let follower = status_entries(
            "minio-operator-1",
            &ControllerStatus::Active,
            &merged,
            at("2024-05-01T12:05:00Z"),
        );
        assert!(follower.keys().all(|key| !leader.contains_key(key)));

        merged.extend(follower);
        assert_eq!(merged["minio-operator-0.status"], "blocked");
        assert_eq!(merged["minio-operator-1.status"], "active");
    }

    #[test]
    fn test_transition_time_moves_only_on_kind_change() {
        let first = status_entries(
            "p",
            &ControllerStatus::Maintenance("Setting pod spec".to_string()),
            &BTreeMap::new(),
            at("2024-05-01T12:00:00Z"),
        );
        let active = status_entries(
            "p",
            &ControllerStatus::Active,
            &first,
            at("2024-05-01T12:01:00Z"),
        );
        assert_eq!(active["p.lastTransitionTime"], "2024-05-01T12:01:00+00:00");

        let still_active = status_entries(
            "p",
            &ControllerStatus::Active,
            &active,
            at("2024-05-01T13:00:00Z"),
        );
        assert_eq!(
            still_active["p.lastTransitionTime"],
            "2024-05-01T12:01:00+00:00"
        );
    }
}
