//! # Kubernetes Adapters
//!
//! Kubernetes-backed implementations of the controller's collaborators. All
//! objects live in the controller's namespace and are named after the
//! application (see [`ControllerConfig`](crate::config::ControllerConfig)).
//!
//! | Collaborator | Object |
//! |---|---|
//! | Leadership | `Lease` `<app>-leader` |
//! | Persisted state | `Secret` `<app>-operator-state` (`secret_key`, `operator_version`) |
//! | Operator configuration | `ConfigMap` `<app>-config` |
//! | Relation data | consumer `ConfigMap`s; ours: `ConfigMap` and `Secret` `<app>-<relation>` |
//! | Workload spec | `Deployment` `<app>`, env values in `Secret` `<app>-env` |
//! | Status | `ConfigMap` `<app>-operator-status`, keys prefixed with the pod name |

mod config_provider;
mod leadership;
mod relation_bus;
mod state_store;
mod status_sink;
mod workload;

pub use config_provider::ConfigMapConfigProvider;
pub use leadership::LeaseLeadership;
pub use relation_bus::ConfigMapRelationBus;
pub use state_store::SecretStateStore;
pub use status_sink::{render_status_config_map, status_entries, ConfigMapStatusSink};
pub use workload::{env_secret, registry_pull_secret, render_deployment, DeploymentSpecSink};

use crate::constants::LABEL_APP;
use std::collections::BTreeMap;

/// Labels put on every object the controller owns
pub(crate) fn owned_labels(app_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app.kubernetes.io/managed-by".to_string(), crate::constants::FIELD_MANAGER.to_string()),
        (LABEL_APP.to_string(), app_name.to_string()),
    ])
}

pub(crate) fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(api_err) if api_err.code == 404)
}

pub(crate) fn is_conflict(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(api_err) if api_err.code == 409)
}
