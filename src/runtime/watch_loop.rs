//! # Watch Loop
//!
//! Turns cluster changes into [`TriggerEvent`]s and feeds them to the
//! dispatcher one at a time, in arrival order.
//!
//! - startup delivers `Install` on first start and `UpgradeCharm` when the
//!   operator version changed
//! - the operator config map delivers `ConfigChanged`
//! - a labelled consumer config map delivers `RelationJoined` the first time
//!   its app is seen on a relation, `RelationChanged` afterwards

use super::initialization::InitializationResult;
use super::{dispatch_startup, TriggerEvent};
use crate::config::ControllerConfig;
use crate::constants::{LABEL_APP, LABEL_RELATION};
use anyhow::Result;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A change observed in the cluster, before it is mapped to a trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterEvent {
    ConfigApplied,
    ConfigDeleted,
    RelationApplied { relation: String, app: String },
    RelationDeleted { relation: String, app: String },
}

/// Remembers which apps have joined which relation
#[derive(Debug, Default)]
pub struct RelationTracker {
    seen: HashSet<(String, String)>,
}

impl RelationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a cluster event to the trigger it delivers, if any
    pub fn translate(&mut self, event: ClusterEvent) -> Option<TriggerEvent> {
        match event {
            ClusterEvent::ConfigApplied | ClusterEvent::ConfigDeleted => {
                Some(TriggerEvent::ConfigChanged)
            }
            ClusterEvent::RelationApplied { relation, app } => {
                if self.seen.insert((relation.clone(), app)) {
                    Some(TriggerEvent::RelationJoined(relation))
                } else {
                    Some(TriggerEvent::RelationChanged(relation))
                }
            }
            ClusterEvent::RelationDeleted { relation, app } => {
                debug!(relation = %relation, app = %app, "Consumer left relation");
                self.seen.remove(&(relation, app));
                None
            }
        }
    }
}

fn relation_identity(config_map: &ConfigMap) -> Option<(String, String)> {
    let labels = config_map.metadata.labels.as_ref()?;
    let relation = labels.get(LABEL_RELATION)?.clone();
    let app = labels
        .get(LABEL_APP)
        .or(config_map.metadata.name.as_ref())?
        .clone();
    Some((relation, app))
}

fn config_events(client: Client, config: &ControllerConfig) -> BoxStream<'static, ClusterEvent> {
    let api: Api<ConfigMap> = Api::namespaced(client, &config.namespace);
    let selector = format!("metadata.name={}", config.config_map_name());

    watcher(api, watcher::Config::default().fields(&selector))
        .default_backoff()
        .filter_map(|event| async move {
            match event {
                Ok(watcher::Event::Apply(_)) | Ok(watcher::Event::InitApply(_)) => {
                    Some(ClusterEvent::ConfigApplied)
                }
                Ok(watcher::Event::Delete(_)) => Some(ClusterEvent::ConfigDeleted),
                Ok(watcher::Event::Init) | Ok(watcher::Event::InitDone) => None,
                Err(e) => {
                    warn!("Error watching operator config map: {}", e);
                    None
                }
            }
        })
        .boxed()
}

fn relation_events(client: Client, config: &ControllerConfig) -> BoxStream<'static, ClusterEvent> {
    let api: Api<ConfigMap> = Api::namespaced(client, &config.namespace);

    watcher(api, watcher::Config::default().labels(LABEL_RELATION))
        .default_backoff()
        .filter_map(|event| async move {
            match event {
                Ok(watcher::Event::Apply(cm)) | Ok(watcher::Event::InitApply(cm)) => {
                    relation_identity(&cm)
                        .map(|(relation, app)| ClusterEvent::RelationApplied { relation, app })
                }
                Ok(watcher::Event::Delete(cm)) => relation_identity(&cm)
                    .map(|(relation, app)| ClusterEvent::RelationDeleted { relation, app }),
                Ok(watcher::Event::Init) | Ok(watcher::Event::InitDone) => None,
                Err(e) => {
                    warn!("Error watching relation config maps: {}", e);
                    None
                }
            }
        })
        .boxed()
}

/// Run the controller until interrupted
///
/// Watch streams that end are rebuilt after `watch_restart_delay_secs`.
pub async fn run_watch_loop(init: InitializationResult) -> Result<()> {
    let InitializationResult {
        client,
        config,
        dispatcher,
        state,
        server_state: _,
    } = init;

    // A failed startup is retried on the next restart; watch events still run
    match dispatch_startup(&dispatcher, state.as_ref(), env!("CARGO_PKG_VERSION")).await {
        Ok(Some(trigger)) => debug!(event = %trigger, "Startup event delivered"),
        Ok(None) => debug!("Operator version unchanged, no startup event"),
        Err(e) => warn!(error = %e, "Startup event failed"),
    }

    let mut tracker = RelationTracker::new();
    let restart_delay = Duration::from_secs(config.watch_restart_delay_secs);

    loop {
        let mut events = stream::select_all([
            config_events(client.clone(), &config),
            relation_events(client.clone(), &config),
        ]);

        loop {
            tokio::select! {
                next = events.next() => {
                    let Some(event) = next else { break };
                    if let Some(trigger) = tracker.translate(event) {
                        // Already logged by the dispatcher; the next event retries
                        if let Err(e) = dispatcher.dispatch(&trigger).await {
                            debug!(event = %trigger, error = %e, "Continuing after failed event");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping watch loop");
                    return Ok(());
                }
            }
        }

        warn!(
            "Watch streams ended, restarting in {}s",
            restart_delay.as_secs()
        );
        tokio::time::sleep(restart_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;

    fn applied(relation: &str, app: &str) -> ClusterEvent {
        ClusterEvent::RelationApplied {
            relation: relation.to_string(),
            app: app.to_string(),
        }
    }

    #[test]
    fn test_first_sighting_joins_then_changes() {
        let mut tracker = RelationTracker::new();
        assert_eq!(
            tracker.translate(applied("object-storage", "mlflow")),
            Some(TriggerEvent::RelationJoined("object-storage".to_string()))
        );
        assert_eq!(
            tracker.translate(applied("object-storage", "mlflow")),
            Some(TriggerEvent::RelationChanged("object-storage".to_string()))
        );
        assert_eq!(
            tracker.translate(applied("object-storage", "argo")),
            Some(TriggerEvent::RelationJoined("object-storage".to_string()))
        );
    }

    #[test]
    fn test_rejoin_after_delete() {
        let mut tracker = RelationTracker::new();
        tracker.translate(applied("object-storage", "mlflow"));
        assert_eq!(
            tracker.translate(ClusterEvent::RelationDeleted {
                relation: "object-storage".to_string(),
                app: "mlflow".to_string(),
            }),
            None
        );
        assert_eq!(
            tracker.translate(applied("object-storage", "mlflow")),
            Some(TriggerEvent::RelationJoined("object-storage".to_string()))
        );
    }

    #[test]
    fn test_config_events_map_to_config_changed() {
        let mut tracker = RelationTracker::new();
        assert_eq!(
            tracker.translate(ClusterEvent::ConfigApplied),
            Some(TriggerEvent::ConfigChanged)
        );
        assert_eq!(
            tracker.translate(ClusterEvent::ConfigDeleted),
            Some(TriggerEvent::ConfigChanged)
        );
    }

    #[test]
    fn test_relation_identity_requires_relation_label() {
        let mut cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some("mlflow-object-storage".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(relation_identity(&cm), None);

        cm.metadata.labels = Some(
            [(LABEL_RELATION.to_string(), "object-storage".to_string())]
                .into_iter()
                .collect(),
        );
        assert_eq!(
            relation_identity(&cm),
            Some((
                "object-storage".to_string(),
                "mlflow-object-storage".to_string()
            ))
        );
    }
}
