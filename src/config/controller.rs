//! # Controller Configuration
//!
//! Runtime settings loaded from environment variables (populated from the
//! downward API and the operator's own deployment manifest).

use crate::constants::*;
use std::path::PathBuf;

/// Where and as whom the controller runs
///
/// All settings have defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Namespace the workload lives in; doubles as the model name published to consumers
    pub namespace: String,
    /// Application name; published to consumers as the service name
    pub app_name: String,
    /// Name of the pod running this controller instance
    pub pod_name: String,
    /// UID of the pod running this controller instance
    pub pod_uid: Option<String>,
    /// Path of the OCI image resource file
    pub image_resource_path: PathBuf,
    /// HTTP server port for metrics and health checks
    pub metrics_port: u16,
    /// Delay before a failed watch stream is restarted (seconds)
    pub watch_restart_delay_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            pod_name: format!("{DEFAULT_APP_NAME}-operator"),
            pod_uid: None,
            image_resource_path: PathBuf::from(DEFAULT_OCI_IMAGE_RESOURCE_PATH),
            metrics_port: DEFAULT_METRICS_PORT,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            namespace: env_var_or_default("NAMESPACE", defaults.namespace),
            app_name: env_var_or_default("APP_NAME", defaults.app_name),
            pod_name: env_var_or_default("POD_NAME", defaults.pod_name),
            pod_uid: std::env::var("POD_UID").ok().filter(|uid| !uid.is_empty()),
            image_resource_path: env_var_or_default(
                "OCI_IMAGE_RESOURCE",
                defaults.image_resource_path,
            ),
            metrics_port: env_var_or_default("METRICS_PORT", defaults.metrics_port),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                defaults.watch_restart_delay_secs,
            ),
        }
    }

    /// ConfigMap holding the operator configuration
    pub fn config_map_name(&self) -> String {
        format!("{}-config", self.app_name)
    }

    /// Secret holding persisted controller state
    pub fn state_secret_name(&self) -> String {
        format!("{}-operator-state", self.app_name)
    }

    /// ConfigMap reflecting the controller status
    pub fn status_config_map_name(&self) -> String {
        format!("{}-operator-status", self.app_name)
    }

    /// Lease used for leader election
    pub fn lease_name(&self) -> String {
        format!("{}-leader", self.app_name)
    }

    /// ConfigMap this side writes its relation data into
    pub fn relation_config_map_name(&self, relation: &str) -> String {
        format!("{}-{relation}", self.app_name)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
