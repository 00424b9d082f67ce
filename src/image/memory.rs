//! Image resolver with a fixed answer, used by tests.

use super::{ImageDetails, ImageResolveError, ImageResolver};
use crate::constants::OCI_IMAGE_RESOURCE;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug)]
pub struct StaticImageResolver {
    result: Mutex<Result<ImageDetails, ImageResolveError>>,
    calls: AtomicUsize,
}

impl StaticImageResolver {
    pub fn resolving(details: ImageDetails) -> Self {
        Self {
            result: Mutex::new(Ok(details)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ImageResolveError) -> Self {
        Self {
            result: Mutex::new(Err(error)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, result: Result<ImageDetails, ImageResolveError>) {
        if let Ok(mut current) = self.result.lock() {
            *current = result;
        }
    }

    /// Number of fetches performed
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ImageResolver for StaticImageResolver {
    fn resource_name(&self) -> &str {
        OCI_IMAGE_RESOURCE
    }

    async fn fetch(&self) -> Result<ImageDetails, ImageResolveError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.result
            .lock()
            .map_err(|_| ImageResolveError::invalid())?
            .clone()
    }
}
