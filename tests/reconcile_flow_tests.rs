//! # Reconciliation Flow Tests
//!
//! End-to-end reconciliations against in-memory collaborators.
//!
//! These tests verify:
//! - The happy path: publish, maintenance, apply, active
//! - Classified failures and the statuses they report
//! - Short-circuiting of the precondition chain
//! - Secret generation, persistence and override
//! - Idempotence of repeated reconciliations
//! - A follower's status never hides the leader's

mod common;

use common::*;
use minio_operator::controller::reconciler::{ReconcilePhase, Reconciler, SETTING_POD_SPEC};
use minio_operator::host::memory::{StaticLeadership, StatusBoard};
use minio_operator::host::{ControllerStatus, StatusKind};
use minio_operator::image::ImageResolveError;
use minio_operator::runtime::TriggerEvent;
use regex::Regex;
use std::sync::Arc;

const RELATION: &str = "object-storage";

#[tokio::test]
async fn test_example_scenario_publishes_and_applies() {
    let harness = Harness::with_persisted_secret();
    harness.set_config("access-key: AKIAEXAMPLE\nsecret-key: \"\"\nport: \"9000\"\n");
    harness.bus.relate(RELATION, "mlflow", Some(&["v1"]));

    let outcome = harness
        .reconciler
        .reconcile(&TriggerEvent::RelationChanged(RELATION.to_string()))
        .await
        .unwrap();

    assert_eq!(outcome.status, ControllerStatus::Active);
    assert_eq!(
        outcome.phases,
        vec![
            ReconcilePhase::Idle,
            ReconcilePhase::Checking,
            ReconcilePhase::Publishing,
            ReconcilePhase::Applying,
            ReconcilePhase::Terminal(StatusKind::Active),
        ]
    );

    // Connection data
    let written = harness.bus.written(RELATION);
    assert_eq!(written.len(), 1);
    let record: serde_yaml::Value = serde_yaml::from_str(&written[0]).unwrap();
    assert_eq!(record["access-key"], "AKIAEXAMPLE");
    assert_eq!(record["namespace"], MODEL);
    assert_eq!(record["port"], "9000");
    assert_eq!(record["secret-key"], PERSISTED_SECRET);
    assert_eq!(record["secure"], false);
    assert_eq!(record["service"], APP);

    // Pod spec
    let spec = harness.specs.last().unwrap();
    assert_eq!(spec.version, 3);
    assert_eq!(spec.containers.len(), 1);
    let container = &spec.containers[0];
    assert_eq!(container.name, "minio");
    assert_eq!(container.args, vec!["server", "/data"]);
    assert_eq!(container.image_details.image_path, IMAGE);
    assert_eq!(container.ports[0].container_port, 9000);
    assert_eq!(container.env_config["MINIO_ACCESS_KEY"], "AKIAEXAMPLE");
    assert_eq!(container.env_config["MINIO_SECRET_KEY"], PERSISTED_SECRET);

    // Maintenance is reported before the final Active
    assert_eq!(
        harness.statuses.history(),
        vec![
            ControllerStatus::Maintenance(SETTING_POD_SPEC.to_string()),
            ControllerStatus::Active,
        ]
    );
}

#[tokio::test]
async fn test_not_leader_is_silent_active_and_short_circuits() {
    let harness = Harness::new();
    harness.leadership.set_leader(false);

    let outcome = harness
        .reconciler
        .reconcile(&TriggerEvent::ConfigChanged)
        .await
        .unwrap();

    assert_eq!(outcome.status, ControllerStatus::Active);
    assert_eq!(outcome.status.message(), None);
    assert_eq!(harness.image.calls(), 0);
    assert_eq!(harness.bus.advertised(RELATION), None);
    assert!(harness.specs.specs().is_empty());
    assert_eq!(harness.state.save_count(), 0);
}

#[tokio::test]
async fn test_unversioned_consumer_is_waiting() {
    let harness = Harness::new();
    harness.bus.relate(RELATION, "mlflow", None);

    let outcome = harness
        .reconciler
        .reconcile(&TriggerEvent::RelationJoined(RELATION.to_string()))
        .await
        .unwrap();

    assert_eq!(
        outcome.status,
        ControllerStatus::Waiting("List of versions not found for apps: mlflow".to_string())
    );
    assert_eq!(harness.image.calls(), 0);
    assert!(harness.specs.specs().is_empty());
    assert_eq!(harness.statuses.current(), Some(outcome.status));
}

#[tokio::test]
async fn test_incompatible_consumer_is_blocked() {
    let harness = Harness::new();
    harness.bus.relate(RELATION, "argo", Some(&["v2"]));
    harness.bus.relate(RELATION, "mlflow", Some(&["v3"]));

    let outcome = harness
        .reconciler
        .reconcile(&TriggerEvent::RelationChanged(RELATION.to_string()))
        .await
        .unwrap();

    assert_eq!(
        outcome.status,
        ControllerStatus::Blocked("No compatible version found for apps: argo, mlflow".to_string())
    );
    assert_eq!(
        outcome.phases.last(),
        Some(&ReconcilePhase::Terminal(StatusKind::Blocked))
    );
    assert_eq!(harness.image.calls(), 0);
}

#[tokio::test]
async fn test_unresolvable_image_is_blocked_with_resource_name() {
    let harness = Harness::new();
    harness.image.set(Err(ImageResolveError::missing()));

    let outcome = harness
        .reconciler
        .reconcile(&TriggerEvent::Install)
        .await
        .unwrap();

    assert_eq!(
        outcome.status,
        ControllerStatus::Blocked("Missing resource: oci-image".to_string())
    );
    assert!(harness.specs.specs().is_empty());
    assert!(harness.bus.written(RELATION).is_empty());
}

#[tokio::test]
async fn test_generated_secret_is_stable_and_well_formed() {
    let harness = Harness::new();
    let pattern = Regex::new(r"^[A-Z0-9]{30}$").unwrap();

    for trigger in [
        TriggerEvent::Install,
        TriggerEvent::ConfigChanged,
        TriggerEvent::UpgradeCharm,
    ] {
        harness.reconciler.reconcile(&trigger).await.unwrap();
    }

    let secrets: Vec<String> = harness
        .specs
        .specs()
        .iter()
        .map(|spec| spec.containers[0].env_config["MINIO_SECRET_KEY"].clone())
        .collect();
    assert_eq!(secrets.len(), 3);
    assert!(pattern.is_match(&secrets[0]), "bad secret {}", secrets[0]);
    assert!(secrets.iter().all(|secret| secret == &secrets[0]));

    // Generated once, persisted once
    assert_eq!(harness.state.save_count(), 1);
    assert_eq!(
        harness.state.snapshot().await.secret_key.as_deref(),
        Some(secrets[0].as_str())
    );
}

#[tokio::test]
async fn test_configured_secret_overrides_generated() {
    let harness = Harness::with_persisted_secret();
    harness.set_config("secret-key: my-own-secret\n");
    harness.bus.relate(RELATION, "mlflow", Some(&["v1"]));

    harness
        .reconciler
        .reconcile(&TriggerEvent::ConfigChanged)
        .await
        .unwrap();

    let spec = harness.specs.last().unwrap();
    assert_eq!(spec.containers[0].env_config["MINIO_SECRET_KEY"], "my-own-secret");

    let record: serde_yaml::Value =
        serde_yaml::from_str(&harness.bus.written(RELATION)[0]).unwrap();
    assert_eq!(record["secret-key"], "my-own-secret");

    // The generated secret is kept for when the override is removed
    assert_eq!(
        harness.state.snapshot().await.secret_key.as_deref(),
        Some(PERSISTED_SECRET)
    );
}

#[tokio::test]
async fn test_no_consumers_skips_publish() {
    let harness = Harness::new();

    let outcome = harness
        .reconciler
        .reconcile(&TriggerEvent::Install)
        .await
        .unwrap();

    assert_eq!(outcome.status, ControllerStatus::Active);
    assert!(harness.bus.written(RELATION).is_empty());
    assert_eq!(harness.specs.specs().len(), 1);
}

#[tokio::test]
async fn test_repeated_reconciliation_is_idempotent() {
    let harness = Harness::with_persisted_secret();
    harness.bus.relate(RELATION, "mlflow", Some(&["v1"]));

    harness.reconciler.reconcile(&TriggerEvent::Install).await.unwrap();
    harness.reconciler.reconcile(&TriggerEvent::ConfigChanged).await.unwrap();

    let specs = harness.specs.specs();
    assert_eq!(specs.len(), 2);
    assert_eq!(
        serde_json::to_vec(&specs[0]).unwrap(),
        serde_json::to_vec(&specs[1]).unwrap()
    );
    let written = harness.bus.written(RELATION);
    assert_eq!(written[0], written[1]);
}

#[tokio::test]
async fn test_recovery_after_blocked() {
    let harness = Harness::new();
    harness.image.set(Err(ImageResolveError::invalid()));

    let blocked = harness.reconciler.reconcile(&TriggerEvent::Install).await.unwrap();
    assert_eq!(
        blocked.status,
        ControllerStatus::Blocked("Invalid resource: oci-image".to_string())
    );

    harness
        .image
        .set(Ok(minio_operator::image::ImageDetails::new(IMAGE)));
    let recovered = harness
        .reconciler
        .reconcile(&TriggerEvent::UpgradeCharm)
        .await
        .unwrap();
    assert_eq!(recovered.status, ControllerStatus::Active);
    assert_eq!(harness.statuses.current(), Some(ControllerStatus::Active));
}

#[tokio::test]
async fn test_malformed_port_is_unclassified_error() {
    let harness = Harness::new();
    harness.set_config("port: not-a-port\n");

    let result = harness.reconciler.reconcile(&TriggerEvent::ConfigChanged).await;

    assert!(result.is_err());
    assert!(harness.specs.specs().is_empty());
    // Never converted into a status beyond the in-flight maintenance message
    assert_ne!(harness.statuses.current(), Some(ControllerStatus::Active));
}

#[tokio::test]
async fn test_follower_status_does_not_hide_leader_blocked() {
    let harness = Harness::new();
    harness.image.set(Err(ImageResolveError::missing()));
    let board = StatusBoard::new();

    let leader = Reconciler {
        status_sink: Arc::new(board.unit("minio-operator-0")),
        ..harness.reconciler.clone()
    };
    let follower = Reconciler {
        leadership: Arc::new(StaticLeadership::new(false)),
        status_sink: Arc::new(board.unit("minio-operator-1")),
        ..harness.reconciler.clone()
    };

    leader.reconcile(&TriggerEvent::Install).await.unwrap();
    follower.reconcile(&TriggerEvent::Install).await.unwrap();

    let blocked = ControllerStatus::Blocked("Missing resource: oci-image".to_string());
    assert_eq!(board.status("minio-operator-0"), Some(blocked));
    assert_eq!(board.status("minio-operator-1"), Some(ControllerStatus::Active));
}
