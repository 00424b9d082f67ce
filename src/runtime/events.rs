//! # Events
//!
//! The lifecycle and relation events delivered to the controller, and the
//! dispatch table that decides which of them run a reconciliation.

use crate::constants::OBJECT_STORAGE_RELATION;
use crate::controller::reconciler::{ReconcileError, ReconcileOutcome, Reconciler};
use crate::state::StateStore;
use std::fmt;
use tracing::{debug, error, info};

/// A named trigger delivered by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TriggerEvent {
    ConfigChanged,
    Install,
    UpgradeCharm,
    /// A consumer related over the named relation for the first time
    RelationJoined(String),
    /// Relation data of a consumer on the named relation changed
    RelationChanged(String),
}

impl TriggerEvent {
    /// Whether this event is registered to run a reconciliation
    ///
    /// Relation events only count for the `object-storage` relation.
    pub fn triggers_reconcile(&self) -> bool {
        match self {
            Self::ConfigChanged | Self::Install | Self::UpgradeCharm => true,
            Self::RelationJoined(relation) | Self::RelationChanged(relation) => {
                relation == OBJECT_STORAGE_RELATION
            }
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigChanged => f.write_str("config_changed"),
            Self::Install => f.write_str("install"),
            Self::UpgradeCharm => f.write_str("upgrade_charm"),
            Self::RelationJoined(relation) => {
                write!(f, "{}_relation_joined", relation.replace('-', "_"))
            }
            Self::RelationChanged(relation) => {
                write!(f, "{}_relation_changed", relation.replace('-', "_"))
            }
        }
    }
}

/// Routes events to the single reconciliation entry point
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    reconciler: Reconciler,
}

impl EventDispatcher {
    pub fn new(reconciler: Reconciler) -> Self {
        Self { reconciler }
    }

    /// Deliver one event
    ///
    /// Returns `Ok(None)` for events that are not registered. Unclassified
    /// reconciliation errors are logged and returned to the caller.
    pub async fn dispatch(
        &self,
        event: &TriggerEvent,
    ) -> Result<Option<ReconcileOutcome>, ReconcileError> {
        if !event.triggers_reconcile() {
            debug!(event = %event, "Ignoring event");
            return Ok(None);
        }

        match self.reconciler.reconcile(event).await {
            Ok(outcome) => {
                info!(event = %event, status = %outcome.status, "Reconciliation finished");
                Ok(Some(outcome))
            }
            Err(e) => {
                error!(event = %event, error = %e, "Reconciliation failed");
                Err(e)
            }
        }
    }
}

/// Lifecycle event to deliver when the operator starts
///
/// A first start installs. A start under a different version than the one last
/// recorded upgrades. A plain restart delivers nothing extra: the watchers'
/// initial listing replays the config and relation events.
pub fn startup_trigger(recorded: Option<&str>, current: &str) -> Option<TriggerEvent> {
    match recorded {
        None => Some(TriggerEvent::Install),
        Some(recorded) if recorded != current => Some(TriggerEvent::UpgradeCharm),
        Some(_) => None,
    }
}

/// Deliver the startup lifecycle event and record `version` once it succeeded
///
/// A failed dispatch leaves the recorded version untouched, so the next start
/// delivers the same event again.
pub async fn dispatch_startup(
    dispatcher: &EventDispatcher,
    state: &dyn StateStore,
    version: &str,
) -> Result<Option<TriggerEvent>, ReconcileError> {
    let mut current = state.load().await?;
    let trigger = startup_trigger(current.operator_version.as_deref(), version);

    if let Some(trigger) = &trigger {
        dispatcher.dispatch(trigger).await?;
        current = state.load().await?;
        current.operator_version = Some(version.to_string());
        state.save(&current).await?;
        info!(event = %trigger, version = %version, "Recorded operator version");
    }
    Ok(trigger)
}
