//! # Host Contracts
//!
//! Interfaces to the orchestration runtime the controller runs under: who leads,
//! which model and application this is, what the operator configured, and where the
//! desired workload specification and status go.
//!
//! The reconciler only ever talks to these traits. Kubernetes-backed implementations
//! live in [`crate::kubernetes`]; in-memory ones in [`memory`].

pub mod memory;
mod status;

pub use status::{ControllerStatus, StatusKind};

use crate::config::{ConfigError, OperatorConfig};
use crate::controller::reconciler::PodSpec;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by host collaborators
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Other(String),
}

/// Model/application identity supplied by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelIdentity {
    /// Model name; published to consumers as `namespace`
    pub model_name: String,
    /// Application name; published to consumers as `service`
    pub app_name: String,
}

/// Answers whether this controller instance is the elected leader
#[async_trait]
pub trait Leadership: Send + Sync {
    async fn is_leader(&self) -> Result<bool, HostError>;
}

/// Read-only access to the operator configuration
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn config(&self) -> Result<OperatorConfig, HostError>;
}

/// Receives the desired workload specification
///
/// Applying the same specification twice must be a no-op.
#[async_trait]
pub trait WorkloadSpecSink: Send + Sync {
    async fn set_spec(&self, spec: &PodSpec) -> Result<(), HostError>;
}

/// Receives the externally visible controller status
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn set_status(&self, status: &ControllerStatus) -> Result<(), HostError>;
}
