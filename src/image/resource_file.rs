//! # OCI Image Resource File
//!
//! Reads the image resource attached to the deployment: a YAML document with
//! `registrypath` and, for private registries, `username` and `password`.

use super::{ImageDetails, ImageResolveError, ImageResolver};
use crate::constants::OCI_IMAGE_RESOURCE;
use async_trait::async_trait;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ResourceDocument {
    registrypath: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Image resolver backed by a resource file on disk
#[derive(Debug, Clone)]
pub struct ResourceFileImageResolver {
    path: PathBuf,
    resource_name: String,
}

impl ResourceFileImageResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            resource_name: OCI_IMAGE_RESOURCE.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse resource file contents
    ///
    /// Empty contents count as a missing resource; anything that is not a YAML
    /// mapping with `registrypath` is invalid.
    pub fn parse(contents: &str) -> Result<ImageDetails, ImageResolveError> {
        if contents.trim().is_empty() {
            return Err(ImageResolveError::missing());
        }
        let document: ResourceDocument = serde_yaml::from_str(contents).map_err(|e| {
            warn!("Invalid image resource: {}", e);
            ImageResolveError::invalid()
        })?;
        Ok(ImageDetails {
            image_path: document.registrypath,
            username: document.username,
            password: document.password,
        })
    }
}

#[async_trait]
impl ImageResolver for ResourceFileImageResolver {
    fn resource_name(&self) -> &str {
        &self.resource_name
    }

    async fn fetch(&self) -> Result<ImageDetails, ImageResolveError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Image resource {} not found", self.path.display());
                return Err(ImageResolveError::missing());
            }
            Err(e) => {
                warn!(
                    "Failed to read image resource {}: {}",
                    self.path.display(),
                    e
                );
                return Err(ImageResolveError::invalid());
            }
        };
        Self::parse(&contents)
    }
}
