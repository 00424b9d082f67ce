//! # Reconciler Types
//!
//! The reconciler context and the state machine a reconciliation walks through.

use crate::host::{
    ConfigProvider, ControllerStatus, Leadership, ModelIdentity, StatusKind, StatusSink,
    WorkloadSpecSink,
};
use crate::image::ImageResolver;
use crate::relation::SchemaNegotiator;
use crate::state::SecretStore;
use std::fmt;
use std::sync::Arc;

/// Reconciler context: every collaborator a reconciliation needs
///
/// Built once at startup and shared by every event.
#[derive(Clone)]
pub struct Reconciler {
    pub model: ModelIdentity,
    pub leadership: Arc<dyn Leadership>,
    pub negotiator: Arc<dyn SchemaNegotiator>,
    pub image_resolver: Arc<dyn ImageResolver>,
    pub config_provider: Arc<dyn ConfigProvider>,
    pub secret_store: SecretStore,
    pub workload: Arc<dyn WorkloadSpecSink>,
    pub status_sink: Arc<dyn StatusSink>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Phases of one reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePhase {
    Idle,
    Checking,
    Publishing,
    Applying,
    Terminal(StatusKind),
}

/// What a reconciliation ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Final status reported to the status sink
    pub status: ControllerStatus,
    /// Phases passed through, starting at `Idle` and ending at `Terminal`
    pub phases: Vec<ReconcilePhase>,
}
