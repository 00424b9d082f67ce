//! # Pod Specification
//!
//! The desired workload specification and the pure function that builds it.
//!
//! The result depends only on the operator configuration, the persisted secret key
//! and the resolved image. Maps are ordered so that equal inputs serialize to
//! byte-identical output.

use crate::config::{ConfigError, OperatorConfig};
use crate::constants::{
    ENV_ACCESS_KEY, ENV_SECRET_KEY, POD_SPEC_VERSION, WORKLOAD_ARGS, WORKLOAD_NAME,
};
use crate::image::ImageDetails;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declarative description of the workload submitted to the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Schema version tag of the specification format
    pub version: u32,
    pub containers: Vec<ContainerSpec>,
}

/// One container entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    pub name: String,
    pub args: Vec<String>,
    pub image_details: ImageDetails,
    pub ports: Vec<ContainerPortSpec>,
    pub env_config: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPortSpec {
    pub name: String,
    pub container_port: i32,
}

impl PodSpec {
    /// The workload container, if present
    pub fn workload_container(&self) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.name == WORKLOAD_NAME)
    }
}

/// Build the desired specification
///
/// `generated_secret` is the persisted secret; it is used unless the configuration
/// overrides it. The only failure is a port that does not coerce to an integer.
pub fn build_pod_spec(
    config: &OperatorConfig,
    generated_secret: &str,
    image_details: &ImageDetails,
) -> Result<PodSpec, ConfigError> {
    let container_port = config.port.as_container_port()?;
    let secret_key = config.effective_secret_key(generated_secret);

    let env_config = BTreeMap::from([
        (ENV_ACCESS_KEY.to_string(), config.access_key.clone()),
        (ENV_SECRET_KEY.to_string(), secret_key.to_string()),
    ]);

    Ok(PodSpec {
        version: POD_SPEC_VERSION,
        containers: vec![ContainerSpec {
            name: WORKLOAD_NAME.to_string(),
            args: WORKLOAD_ARGS.iter().map(ToString::to_string).collect(),
            image_details: image_details.clone(),
            ports: vec![ContainerPortSpec {
                name: WORKLOAD_NAME.to_string(),
                container_port,
            }],
            env_config,
        }],
    })
}
