//! In-memory host collaborators.
//!
//! Static answers for leadership and configuration, and sinks that record every
//! value they receive. Used by tests.

use super::{
    ConfigProvider, ControllerStatus, HostError, Leadership, StatusSink, WorkloadSpecSink,
};
use crate::config::OperatorConfig;
use crate::controller::reconciler::PodSpec;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Leadership flag that can be flipped at runtime
#[derive(Debug)]
pub struct StaticLeadership {
    leader: AtomicBool,
    calls: AtomicUsize,
}

impl StaticLeadership {
    pub fn new(leader: bool) -> Self {
        Self {
            leader: AtomicBool::new(leader),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_leader(&self, leader: bool) {
        self.leader.store(leader, Ordering::Relaxed);
    }

    /// Number of times leadership was queried
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Leadership for StaticLeadership {
    async fn is_leader(&self) -> Result<bool, HostError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.leader.load(Ordering::Relaxed))
    }
}

/// Configuration provider returning whatever was last set
#[derive(Debug, Default)]
pub struct StaticConfigProvider {
    config: Mutex<OperatorConfig>,
}

impl StaticConfigProvider {
    pub fn new(config: OperatorConfig) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    pub fn set(&self, config: OperatorConfig) {
        if let Ok(mut current) = self.config.lock() {
            *current = config;
        }
    }
}

#[async_trait]
impl ConfigProvider for StaticConfigProvider {
    async fn config(&self) -> Result<OperatorConfig, HostError> {
        self.config
            .lock()
            .map(|config| config.clone())
            .map_err(|e| HostError::Other(format!("config lock poisoned: {e}")))
    }
}

/// Workload-spec sink that records every submitted specification
#[derive(Debug, Default)]
pub struct RecordingSpecSink {
    specs: Mutex<Vec<PodSpec>>,
}

impl RecordingSpecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn specs(&self) -> Vec<PodSpec> {
        self.specs.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<PodSpec> {
        self.specs().pop()
    }
}

#[async_trait]
impl WorkloadSpecSink for RecordingSpecSink {
    async fn set_spec(&self, spec: &PodSpec) -> Result<(), HostError> {
        self.specs
            .lock()
            .map_err(|e| HostError::Other(format!("spec sink lock poisoned: {e}")))?
            .push(spec.clone());
        Ok(())
    }
}

/// Status sink that records every status transition
#[derive(Debug, Default)]
pub struct RecordingStatusSink {
    history: Mutex<Vec<ControllerStatus>>,
}

impl RecordingStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<ControllerStatus> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    /// The currently visible status
    pub fn current(&self) -> Option<ControllerStatus> {
        self.history().pop()
    }
}

#[async_trait]
impl StatusSink for RecordingStatusSink {
    async fn set_status(&self, status: &ControllerStatus) -> Result<(), HostError> {
        self.history
            .lock()
            .map_err(|e| HostError::Other(format!("status sink lock poisoned: {e}")))?
            .push(status.clone());
        Ok(())
    }
}

/// Status shared by several units, one entry per unit
///
/// Each unit writes only its own entry through the sink returned by
/// [`StatusBoard::unit`].
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    entries: Arc<Mutex<BTreeMap<String, ControllerStatus>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit(&self, name: &str) -> UnitStatusSink {
        UnitStatusSink {
            board: self.clone(),
            unit: name.to_string(),
        }
    }

    pub fn status(&self, unit: &str) -> Option<ControllerStatus> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(unit).cloned())
    }
}

/// A single unit's view of a [`StatusBoard`]
#[derive(Debug, Clone)]
pub struct UnitStatusSink {
    board: StatusBoard,
    unit: String,
}

#[async_trait]
impl StatusSink for UnitStatusSink {
    async fn set_status(&self, status: &ControllerStatus) -> Result<(), HostError> {
        self.board
            .entries
            .lock()
            .map_err(|e| HostError::Other(format!("status board lock poisoned: {e}")))?
            .insert(self.unit.clone(), status.clone());
        Ok(())
    }
}
