//! # Relation Data Publisher
//!
//! Pushes connection parameters to consumers of the `object-storage` relation.

use super::error::ReconcileError;
use crate::config::OperatorConfig;
use crate::constants::OBJECT_STORAGE_RELATION;
use crate::host::ModelIdentity;
use crate::observability::metrics;
use crate::relation::{Interfaces, ObjectStorageData};
use tracing::{debug, info};

/// Build the record consumers receive
pub fn object_storage_data(
    config: &OperatorConfig,
    model: &ModelIdentity,
    secret_key: &str,
) -> ObjectStorageData {
    ObjectStorageData {
        access_key: config.access_key.clone(),
        namespace: model.model_name.clone(),
        port: config.port.clone(),
        secret_key: secret_key.to_string(),
        secure: false,
        service: model.app_name.clone(),
    }
}

/// Send connection data to related consumers
///
/// Returns whether anything was sent. A null handle (no consumer related) is a
/// no-op, not an error.
pub async fn publish(
    interfaces: &Interfaces,
    config: &OperatorConfig,
    model: &ModelIdentity,
    secret_key: &str,
) -> Result<bool, ReconcileError> {
    let Some(handle) = interfaces.get(OBJECT_STORAGE_RELATION) else {
        debug!("No {} consumers related, nothing to publish", OBJECT_STORAGE_RELATION);
        return Ok(false);
    };

    let data = object_storage_data(config, model, secret_key).to_value()?;
    handle.send_data(data).await?;
    metrics::increment_relation_publishes(OBJECT_STORAGE_RELATION);
    info!(
        relation = OBJECT_STORAGE_RELATION,
        version = handle.version(),
        "Published connection data"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortValue;
    use crate::relation::{InMemoryRelationBus, SchemaNegotiator, VersionNegotiator};
    use std::sync::Arc;

    fn model() -> ModelIdentity {
        ModelIdentity {
            model_name: "kubeflow".to_string(),
            app_name: "minio".to_string(),
        }
    }

    #[tokio::test]
    async fn test_null_handle_is_noop() {
        let bus = Arc::new(InMemoryRelationBus::new());
        let interfaces = VersionNegotiator::new(bus.clone())
            .get_interfaces()
            .await
            .unwrap();

        let sent = publish(&interfaces, &OperatorConfig::default(), &model(), "SECRET")
            .await
            .unwrap();
        assert!(!sent);
        assert!(bus.written("object-storage").is_empty());
    }

    #[tokio::test]
    async fn test_sends_fixed_shape_record() {
        let bus = Arc::new(InMemoryRelationBus::new());
        bus.relate("object-storage", "pipelines", Some(&["v1"]));
        let interfaces = VersionNegotiator::new(bus.clone())
            .get_interfaces()
            .await
            .unwrap();
        let config = OperatorConfig {
            access_key: "AKIA".to_string(),
            secret_key: String::new(),
            port: PortValue::Text("9000".to_string()),
        };

        let sent = publish(&interfaces, &config, &model(), "SECRET").await.unwrap();
        assert!(sent);

        let written = bus.written("object-storage");
        let record: ObjectStorageData = serde_yaml::from_str(&written[0]).unwrap();
        assert_eq!(record, object_storage_data(&config, &model(), "SECRET"));
        assert!(!record.secure);
        assert_eq!(record.namespace, "kubeflow");
        assert_eq!(record.service, "minio");
    }
}
