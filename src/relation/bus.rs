//! # Relation Bus
//!
//! Transport for relation data: who is related, which versions they advertise,
//! and where this side's data goes.

use super::RelationError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// A consumer application on the other end of a relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedApp {
    pub name: String,
    /// Versions the app advertised; `None` until it advertises any
    pub supported_versions: Option<Vec<String>>,
}

#[async_trait]
pub trait RelationBus: Send + Sync {
    /// Apps currently related over `relation`
    async fn related_apps(&self, relation: &str) -> Result<Vec<RelatedApp>, RelationError>;

    /// Advertise the schema versions this side speaks
    async fn advertise_versions(
        &self,
        relation: &str,
        versions: &[String],
    ) -> Result<(), RelationError>;

    /// Publish this side's serialized record
    async fn write_data(&self, relation: &str, data: &str) -> Result<(), RelationError>;
}

/// Relation bus held in process memory
#[derive(Debug, Default)]
pub struct InMemoryRelationBus {
    related: Mutex<BTreeMap<String, Vec<RelatedApp>>>,
    advertised: Mutex<BTreeMap<String, Vec<String>>>,
    written: Mutex<BTreeMap<String, Vec<String>>>,
}

impl InMemoryRelationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relate an app, replacing any previous entry with the same name
    pub fn relate(&self, relation: &str, app: &str, versions: Option<&[&str]>) {
        if let Ok(mut related) = self.related.lock() {
            let apps = related.entry(relation.to_string()).or_default();
            apps.retain(|existing| existing.name != app);
            apps.push(RelatedApp {
                name: app.to_string(),
                supported_versions: versions
                    .map(|versions| versions.iter().map(ToString::to_string).collect()),
            });
        }
    }

    pub fn unrelate(&self, relation: &str, app: &str) {
        if let Ok(mut related) = self.related.lock() {
            if let Some(apps) = related.get_mut(relation) {
                apps.retain(|existing| existing.name != app);
            }
        }
    }

    /// Versions this side last advertised on `relation`
    pub fn advertised(&self, relation: &str) -> Option<Vec<String>> {
        self.advertised
            .lock()
            .ok()
            .and_then(|advertised| advertised.get(relation).cloned())
    }

    /// Every record written to `relation`, oldest first
    pub fn written(&self, relation: &str) -> Vec<String> {
        self.written
            .lock()
            .ok()
            .and_then(|written| written.get(relation).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RelationBus for InMemoryRelationBus {
    async fn related_apps(&self, relation: &str) -> Result<Vec<RelatedApp>, RelationError> {
        let related = self
            .related
            .lock()
            .map_err(|e| RelationError::Backend(format!("relation lock poisoned: {e}")))?;
        Ok(related.get(relation).cloned().unwrap_or_default())
    }

    async fn advertise_versions(
        &self,
        relation: &str,
        versions: &[String],
    ) -> Result<(), RelationError> {
        self.advertised
            .lock()
            .map_err(|e| RelationError::Backend(format!("relation lock poisoned: {e}")))?
            .insert(relation.to_string(), versions.to_vec());
        Ok(())
    }

    async fn write_data(&self, relation: &str, data: &str) -> Result<(), RelationError> {
        self.written
            .lock()
            .map_err(|e| RelationError::Backend(format!("relation lock poisoned: {e}")))?
            .entry(relation.to_string())
            .or_default()
            .push(data.to_string());
        Ok(())
    }
}
