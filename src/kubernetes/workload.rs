//! # Deployment Spec Sink
//!
//! Converges the desired pod spec onto an `apps/v1` `Deployment` with a single
//! replica. Objects are applied with server-side apply, so applying an
//! unchanged spec is a no-op on the API server.
//!
//! Container environment values (which include the MinIO secret key) never
//! appear in the `Deployment`: they are applied to the `<app>-env` secret and
//! referenced through `secretKeyRef`. A checksum of the values is stamped on
//! the pod template so a changed value rolls the pod.
//!
//! When the image carries registry credentials, a `kubernetes.io/dockerconfigjson`
//! secret is applied alongside and referenced as an image pull secret.

use super::owned_labels;
use crate::config::ControllerConfig;
use crate::constants::FIELD_MANAGER;
use crate::controller::reconciler::{ContainerSpec, PodSpec};
use crate::host::{HostError, WorkloadSpecSink};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, EnvVarSource, LocalObjectReference,
    PodSpec as K8sPodSpec, PodTemplateSpec, Secret, SecretKeySelector,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::ByteString;
use kube::api::{Api, ObjectMeta, Patch, PatchParams};
use kube::Client;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::info;

const DOCKER_HUB_REGISTRY: &str = "https://index.docker.io/v1/";
const ENV_CHECKSUM_ANNOTATION: &str = "minio.operator/env-checksum";

pub struct DeploymentSpecSink {
    deployments: Api<Deployment>,
    secrets: Api<Secret>,
    app_name: String,
}

impl std::fmt::Debug for DeploymentSpecSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentSpecSink")
            .field("app_name", &self.app_name)
            .finish_non_exhaustive()
    }
}

impl DeploymentSpecSink {
    pub fn new(client: Client, config: &ControllerConfig) -> Self {
        Self {
            deployments: Api::namespaced(client.clone(), &config.namespace),
            secrets: Api::namespaced(client, &config.namespace),
            app_name: config.app_name.clone(),
        }
    }
}

fn selector_labels(app_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app.kubernetes.io/name".to_string(), app_name.to_string())])
}

fn pull_secret_name(app_name: &str) -> String {
    format!("{app_name}-registry")
}

fn env_secret_name(app_name: &str) -> String {
    format!("{app_name}-env")
}

/// Environment of every container, merged by variable name
fn workload_env(spec: &PodSpec) -> BTreeMap<String, String> {
    spec.containers
        .iter()
        .flat_map(|container| container.env_config.clone())
        .collect()
}

/// Secret holding the container environment values
pub fn env_secret(spec: &PodSpec, app_name: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(env_secret_name(app_name)),
            labels: Some(owned_labels(app_name)),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(
            workload_env(spec)
                .into_iter()
                .map(|(name, value)| (name, ByteString(value.into_bytes())))
                .collect(),
        ),
        ..Default::default()
    }
}

/// SHA-256 over the environment values, stable for equal input
fn env_checksum(spec: &PodSpec) -> String {
    let mut hasher = Sha256::new();
    for (name, value) in workload_env(spec) {
        hasher.update(name.as_bytes());
        hasher.update([0]);
        hasher.update(value.as_bytes());
        hasher.update([0]);
    }
    format!("sha256:{:x}", hasher.finalize())
}

fn render_container(container: &ContainerSpec, app_name: &str) -> Container {
    Container {
        name: container.name.clone(),
        image: Some(container.image_details.image_path.clone()),
        args: Some(container.args.clone()),
        ports: Some(
            container
                .ports
                .iter()
                .map(|port| ContainerPort {
                    name: Some(port.name.clone()),
                    container_port: port.container_port,
                    ..Default::default()
                })
                .collect(),
        ),
        env: Some(
            container
                .env_config
                .iter()
                .map(|(name, _)| EnvVar {
                    name: name.clone(),
                    value: None,
                    value_from: Some(EnvVarSource {
                        secret_key_ref: Some(SecretKeySelector {
                            name: env_secret_name(app_name),
                            key: name.clone(),
                            optional: None,
                        }),
                        ..Default::default()
                    }),
                })
                .collect(),
        ),
        ..Default::default()
    }
}

/// Registry host of an image reference, Docker Hub when the reference has none
fn registry_host(image_path: &str) -> &str {
    match image_path.split_once('/') {
        Some((host, _)) if host.contains('.') || host.contains(':') || host == "localhost" => host,
        _ => DOCKER_HUB_REGISTRY,
    }
}

/// Pull secret for the first container whose image has registry credentials
pub fn registry_pull_secret(spec: &PodSpec, app_name: &str) -> Option<Secret> {
    let image = spec
        .containers
        .iter()
        .map(|container| &container.image_details)
        .find(|image| image.username.is_some() || image.password.is_some())?;

    let host = registry_host(&image.image_path);
    let config = json!({
        "auths": {
            host: {
                "username": image.username.clone().unwrap_or_default(),
                "password": image.password.clone().unwrap_or_default(),
            }
        }
    });

    Some(Secret {
        metadata: ObjectMeta {
            name: Some(pull_secret_name(app_name)),
            labels: Some(owned_labels(app_name)),
            ..Default::default()
        },
        type_: Some("kubernetes.io/dockerconfigjson".to_string()),
        data: Some(BTreeMap::from([(
            ".dockerconfigjson".to_string(),
            ByteString(config.to_string().into_bytes()),
        )])),
        ..Default::default()
    })
}

/// Render the `Deployment` running `spec`
pub fn render_deployment(spec: &PodSpec, app_name: &str) -> Deployment {
    let mut labels = owned_labels(app_name);
    labels.extend(selector_labels(app_name));

    let has_credentials = registry_pull_secret(spec, app_name).is_some();

    Deployment {
        metadata: ObjectMeta {
            name: Some(app_name.to_string()),
            labels: Some(labels.clone()),
            annotations: Some(BTreeMap::from([(
                "minio.operator/pod-spec-version".to_string(),
                spec.version.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector_labels(app_name)),
                ..Default::default()
            },
            // A single server must not run twice against the same data
            strategy: Some(DeploymentStrategy {
                type_: Some("Recreate".to_string()),
                ..Default::default()
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    annotations: Some(BTreeMap::from([(
                        ENV_CHECKSUM_ANNOTATION.to_string(),
                        env_checksum(spec),
                    )])),
                    ..Default::default()
                }),
                spec: Some(K8sPodSpec {
                    containers: spec
                        .containers
                        .iter()
                        .map(|container| render_container(container, app_name))
                        .collect(),
                    image_pull_secrets: has_credentials.then(|| {
                        vec![LocalObjectReference {
                            name: pull_secret_name(app_name),
                        }]
                    }),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[async_trait]
impl WorkloadSpecSink for DeploymentSpecSink {
    async fn set_spec(&self, spec: &PodSpec) -> Result<(), HostError> {
        let params = PatchParams::apply(FIELD_MANAGER).force();

        let env = env_secret(spec, &self.app_name);
        self.secrets
            .patch(&env_secret_name(&self.app_name), &params, &Patch::Apply(&env))
            .await?;

        if let Some(secret) = registry_pull_secret(spec, &self.app_name) {
            let name = pull_secret_name(&self.app_name);
            self.secrets.patch(&name, &params, &Patch::Apply(&secret)).await?;
        }

        let deployment = render_deployment(spec, &self.app_name);
        self.deployments
            .patch(&self.app_name, &params, &Patch::Apply(&deployment))
            .await?;
        info!(deployment = %self.app_name, "Deployment applied");
        Ok(())
    }
}
