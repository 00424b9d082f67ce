//! # Container Image Resolution
//!
//! Resolves the container image reference (and optional registry credentials) the
//! workload runs. Resolution happens on every reconciliation and is never cached.

mod memory;
mod resource_file;

pub use memory::StaticImageResolver;
pub use resource_file::ResourceFileImageResolver;

use crate::host::StatusKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resolved container image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetails {
    /// Full image reference, e.g. `docker.io/minio/minio:RELEASE.2021-03-01`
    pub image_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ImageDetails {
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
            username: None,
            password: None,
        }
    }
}

/// Image resolution failure with the status it should be reported as
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status_message}")]
pub struct ImageResolveError {
    /// Human-readable reason, e.g. "Missing resource"
    pub status_message: String,
    /// Status kind the failure maps to
    pub status: StatusKind,
}

impl ImageResolveError {
    pub fn missing() -> Self {
        Self {
            status_message: "Missing resource".to_string(),
            status: StatusKind::Blocked,
        }
    }

    pub fn invalid() -> Self {
        Self {
            status_message: "Invalid resource".to_string(),
            status: StatusKind::Blocked,
        }
    }
}

/// Source of the workload's container image
#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// Logical name of the image resource, appended to failure messages
    fn resource_name(&self) -> &str;

    async fn fetch(&self) -> Result<ImageDetails, ImageResolveError>;
}
