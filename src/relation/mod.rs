//! # Relations
//!
//! Structured data exchange with consumer components over named relations.
//!
//! Before any data flows, both sides agree on a schema version: each advertises the
//! versions it speaks and the highest common one wins. The negotiator returns one
//! entry per relation name this side knows; the entry is `None` while no consumer
//! is related.

mod bus;
mod negotiation;
mod object_storage;

pub use bus::{InMemoryRelationBus, RelatedApp, RelationBus};
pub use negotiation::{highest_version, BusRelationInterface, VersionNegotiator};
pub use object_storage::ObjectStorageData;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while reading or writing relation data
#[derive(Debug, Error)]
pub enum RelationError {
    #[error("failed to serialize relation data: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("{0}")]
    Backend(String),
}

/// Negotiation outcome other than success
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// A related app has not advertised any schema version yet
    #[error("List of versions not found for apps: {}", .apps.join(", "))]
    NoVersionsListed { apps: Vec<String> },
    /// Advertised versions do not overlap
    #[error("No compatible version found for apps: {}", .apps.join(", "))]
    NoCompatibleVersions { apps: Vec<String> },
    #[error(transparent)]
    Relation(#[from] RelationError),
}

/// A negotiated relation endpoint data can be sent through
#[async_trait]
pub trait RelationInterface: Send + Sync {
    fn relation_name(&self) -> &str;

    /// Schema version agreed with the related apps
    fn version(&self) -> &str;

    /// Publish a record to every related app
    async fn send_data(&self, data: serde_json::Value) -> Result<(), RelationError>;
}

/// Negotiated interfaces keyed by relation name
#[derive(Clone, Default)]
pub struct Interfaces {
    handles: BTreeMap<String, Option<Arc<dyn RelationInterface>>>,
}

impl Interfaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        relation: impl Into<String>,
        handle: Option<Arc<dyn RelationInterface>>,
    ) {
        self.handles.insert(relation.into(), handle);
    }

    /// Handle for a relation; `None` when unknown or when no consumer is related
    pub fn get(&self, relation: &str) -> Option<&Arc<dyn RelationInterface>> {
        self.handles.get(relation).and_then(Option::as_ref)
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }
}

impl fmt::Debug for Interfaces {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.handles
                    .iter()
                    .map(|(name, handle)| (name, handle.as_ref().map(|h| h.version()))),
            )
            .finish()
    }
}

/// Produces the negotiated interfaces for every relation this side provides
#[async_trait]
pub trait SchemaNegotiator: Send + Sync {
    async fn get_interfaces(&self) -> Result<Interfaces, NegotiationError>;
}
