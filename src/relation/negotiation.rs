//! # Schema Version Negotiation
//!
//! Agrees on a schema version per relation with every related app.

use super::{
    Interfaces, NegotiationError, RelatedApp, RelationBus, RelationError, RelationInterface,
    SchemaNegotiator,
};
use crate::constants::{OBJECT_STORAGE_RELATION, OBJECT_STORAGE_VERSIONS};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Pick the highest version from a set of `vN` strings
///
/// Numeric suffixes compare numerically (`v10` > `v2`). Anything else ranks
/// below every numeric version and compares lexically among itself.
pub fn highest_version<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().max_by(|a, b| version_key(a).cmp(&version_key(b)))
}

fn version_key(version: &str) -> (Option<u64>, &str) {
    (
        version.strip_prefix('v').and_then(|n| n.parse().ok()),
        version,
    )
}

/// Negotiates versions over a [`RelationBus`]
pub struct VersionNegotiator {
    bus: Arc<dyn RelationBus>,
    supported: BTreeMap<String, Vec<String>>,
}

impl fmt::Debug for VersionNegotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionNegotiator")
            .field("supported", &self.supported)
            .finish_non_exhaustive()
    }
}

impl VersionNegotiator {
    /// Negotiator for the relations this controller provides
    pub fn new(bus: Arc<dyn RelationBus>) -> Self {
        Self {
            bus,
            supported: BTreeMap::new(),
        }
        .with_relation(OBJECT_STORAGE_RELATION, OBJECT_STORAGE_VERSIONS)
    }

    pub fn with_relation(mut self, relation: &str, versions: &[&str]) -> Self {
        self.supported.insert(
            relation.to_string(),
            versions.iter().map(ToString::to_string).collect(),
        );
        self
    }

    async fn negotiate(
        &self,
        relation: &str,
        ours: &[String],
    ) -> Result<Option<Arc<dyn RelationInterface>>, NegotiationError> {
        self.bus.advertise_versions(relation, ours).await?;

        let apps = self.bus.related_apps(relation).await?;
        if apps.is_empty() {
            debug!(relation, "No related apps");
            return Ok(None);
        }

        let unlisted: Vec<String> = apps
            .iter()
            .filter(|app| app.supported_versions.as_ref().map_or(true, Vec::is_empty))
            .map(|app| app.name.clone())
            .collect();
        if !unlisted.is_empty() {
            return Err(NegotiationError::NoVersionsListed { apps: unlisted });
        }

        let mut common: BTreeSet<&str> = ours.iter().map(String::as_str).collect();
        for RelatedApp {
            supported_versions, ..
        } in &apps
        {
            let theirs: BTreeSet<&str> = supported_versions
                .iter()
                .flatten()
                .map(String::as_str)
                .collect();
            common = common.intersection(&theirs).copied().collect();
        }

        let Some(version) = highest_version(common) else {
            return Err(NegotiationError::NoCompatibleVersions {
                apps: apps.iter().map(|app| app.name.clone()).collect(),
            });
        };

        debug!(relation, version, apps = apps.len(), "Negotiated relation version");
        Ok(Some(Arc::new(BusRelationInterface {
            bus: Arc::clone(&self.bus),
            relation: relation.to_string(),
            version: version.to_string(),
        })))
    }
}

#[async_trait]
impl SchemaNegotiator for VersionNegotiator {
    async fn get_interfaces(&self) -> Result<Interfaces, NegotiationError> {
        let mut interfaces = Interfaces::new();
        for (relation, ours) in &self.supported {
            let handle = self.negotiate(relation, ours).await?;
            interfaces.insert(relation.clone(), handle);
        }
        Ok(interfaces)
    }
}

/// Relation handle that writes through a [`RelationBus`]
pub struct BusRelationInterface {
    bus: Arc<dyn RelationBus>,
    relation: String,
    version: String,
}

impl fmt::Debug for BusRelationInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusRelationInterface")
            .field("relation", &self.relation)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RelationInterface for BusRelationInterface {
    fn relation_name(&self) -> &str {
        &self.relation
    }

    fn version(&self) -> &str {
        &self.version
    }

    async fn send_data(&self, data: serde_json::Value) -> Result<(), RelationError> {
        let serialized = serde_yaml::to_string(&data)?;
        self.bus.write_data(&self.relation, &serialized).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::InMemoryRelationBus;
    use serde_json::json;

    fn negotiator(bus: &Arc<InMemoryRelationBus>) -> VersionNegotiator {
        VersionNegotiator::new(bus.clone())
    }

    #[test]
    fn test_highest_version_is_numeric() {
        assert_eq!(highest_version(["v1", "v10", "v2"]), Some("v10"));
        assert_eq!(highest_version(Vec::<&str>::new()), None);
    }

    #[test]
    fn test_non_numeric_versions_rank_below_numeric() {
        assert_eq!(highest_version(["beta", "v1", "alpha"]), Some("v1"));
        assert_eq!(highest_version(["beta", "alpha"]), Some("beta"));
    }

    #[tokio::test]
    async fn test_no_related_apps_yields_null_handle() {
        let bus = Arc::new(InMemoryRelationBus::new());
        let interfaces = negotiator(&bus).get_interfaces().await.unwrap();

        assert!(interfaces.get("object-storage").is_none());
        assert_eq!(
            interfaces.relation_names().collect::<Vec<_>>(),
            vec!["object-storage"]
        );
        assert_eq!(bus.advertised("object-storage"), Some(vec!["v1".to_string()]));
    }

    #[tokio::test]
    async fn test_unlisted_versions() {
        let bus = Arc::new(InMemoryRelationBus::new());
        bus.relate("object-storage", "pipelines", None);
        bus.relate("object-storage", "katib", Some(&["v1"]));

        let err = negotiator(&bus).get_interfaces().await.unwrap_err();
        assert!(matches!(err, NegotiationError::NoVersionsListed { .. }));
        assert_eq!(err.to_string(), "List of versions not found for apps: pipelines");
    }

    #[tokio::test]
    async fn test_incompatible_versions() {
        let bus = Arc::new(InMemoryRelationBus::new());
        bus.relate("object-storage", "pipelines", Some(&["v2", "v3"]));

        let err = negotiator(&bus).get_interfaces().await.unwrap_err();
        assert!(matches!(err, NegotiationError::NoCompatibleVersions { .. }));
        assert_eq!(err.to_string(), "No compatible version found for apps: pipelines");
    }

    #[tokio::test]
    async fn test_negotiated_handle_sends_yaml() {
        let bus = Arc::new(InMemoryRelationBus::new());
        bus.relate("object-storage", "pipelines", Some(&["v1", "v2"]));

        let interfaces = negotiator(&bus).get_interfaces().await.unwrap();
        let handle = interfaces.get("object-storage").unwrap();
        assert_eq!(handle.version(), "v1");

        handle.send_data(json!({"service": "minio"})).await.unwrap();
        assert_eq!(bus.written("object-storage"), vec!["service: minio\n".to_string()]);
    }

    #[tokio::test]
    async fn test_handle_dropped_after_consumer_leaves() {
        let bus = Arc::new(InMemoryRelationBus::new());
        bus.relate("object-storage", "pipelines", Some(&["v1"]));
        assert!(negotiator(&bus)
            .get_interfaces()
            .await
            .unwrap()
            .get("object-storage")
            .is_some());

        bus.unrelate("object-storage", "pipelines");
        let interfaces = negotiator(&bus).get_interfaces().await.unwrap();
        assert!(interfaces.get("object-storage").is_none());
    }
}
