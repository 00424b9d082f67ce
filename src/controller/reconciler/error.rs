//! # Reconciler Errors
//!
//! Failures that are not routine check outcomes. They are never turned into a
//! status; they surface to whoever delivered the event.

use crate::config::ConfigError;
use crate::host::HostError;
use crate::relation::{NegotiationError, RelationError};
use crate::state::StateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Relation(#[from] RelationError),
    #[error("relation negotiation failed: {0}")]
    Negotiation(NegotiationError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to serialize relation data: {0}")]
    Serialize(#[from] serde_json::Error),
}
