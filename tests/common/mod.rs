//! Shared harness: a reconciler wired entirely to in-memory collaborators.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use minio_operator::config::OperatorConfig;
use minio_operator::controller::reconciler::Reconciler;
use minio_operator::host::memory::{
    RecordingSpecSink, RecordingStatusSink, StaticConfigProvider, StaticLeadership,
};
use minio_operator::host::ModelIdentity;
use minio_operator::image::{ImageDetails, StaticImageResolver};
use minio_operator::relation::{InMemoryRelationBus, VersionNegotiator};
use minio_operator::state::{ControllerState, InMemoryStateStore, SecretStore};
use std::sync::Arc;

pub const MODEL: &str = "kubeflow";
pub const APP: &str = "minio";
pub const PERSISTED_SECRET: &str = "ABCDEF0123456789ABCDEF01234567";
pub const IMAGE: &str = "minio/minio:RELEASE.2021-03-01T04-20-55Z";

pub struct Harness {
    pub leadership: Arc<StaticLeadership>,
    pub bus: Arc<InMemoryRelationBus>,
    pub image: Arc<StaticImageResolver>,
    pub config: Arc<StaticConfigProvider>,
    pub state: Arc<InMemoryStateStore>,
    pub specs: Arc<RecordingSpecSink>,
    pub statuses: Arc<RecordingStatusSink>,
    pub reconciler: Reconciler,
}

impl Harness {
    /// Leader, no consumers, resolvable image, default config, empty state
    pub fn new() -> Self {
        Self::with_state(InMemoryStateStore::new())
    }

    /// Like [`Harness::new`] but with the secret already persisted
    pub fn with_persisted_secret() -> Self {
        Self::with_state(InMemoryStateStore::with_state(ControllerState {
            secret_key: Some(PERSISTED_SECRET.to_string()),
            ..Default::default()
        }))
    }

    fn with_state(state: InMemoryStateStore) -> Self {
        let leadership = Arc::new(StaticLeadership::new(true));
        let bus = Arc::new(InMemoryRelationBus::new());
        let image = Arc::new(StaticImageResolver::resolving(ImageDetails::new(IMAGE)));
        let config = Arc::new(StaticConfigProvider::new(OperatorConfig::default()));
        let state = Arc::new(state);
        let specs = Arc::new(RecordingSpecSink::new());
        let statuses = Arc::new(RecordingStatusSink::new());

        let reconciler = Reconciler {
            model: ModelIdentity {
                model_name: MODEL.to_string(),
                app_name: APP.to_string(),
            },
            leadership: leadership.clone(),
            negotiator: Arc::new(VersionNegotiator::new(bus.clone())),
            image_resolver: image.clone(),
            config_provider: config.clone(),
            secret_store: SecretStore::new(state.clone()),
            workload: specs.clone(),
            status_sink: statuses.clone(),
        };

        Self {
            leadership,
            bus,
            image,
            config,
            state,
            specs,
            statuses,
            reconciler,
        }
    }

    pub fn set_config(&self, yaml: &str) {
        self.config
            .set(OperatorConfig::from_yaml(yaml).expect("test config must parse"));
    }
}
