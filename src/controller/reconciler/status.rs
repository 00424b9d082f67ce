//! # Check Failures
//!
//! Routine reasons a reconciliation stops early, and the status each one reports.

use crate::host::{ControllerStatus, StatusKind};
use thiserror::Error;

/// A precondition that did not hold
///
/// Each kind maps to exactly one status. None of them is retried internally; the
/// next delivered event re-runs the checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckFailed {
    /// This instance is not the elected leader
    #[error("not the leader")]
    NotLeader,
    /// No side has advertised a schema version yet
    #[error("{0}")]
    InterfacesUnversioned(String),
    /// Advertised schema versions do not overlap
    #[error("{0}")]
    InterfacesIncompatible(String),
    /// The container image could not be resolved
    #[error("{message}")]
    ImageUnresolvable { message: String, status: StatusKind },
}

impl CheckFailed {
    // TODO: report a dedicated standby status for followers once the status sink grows one.
    /// Status to report for this failure
    ///
    /// `NotLeader` reports a silent `Active`: only the leader manages the workload
    /// and followers have nothing to show.
    pub fn status(&self) -> ControllerStatus {
        match self {
            CheckFailed::NotLeader => ControllerStatus::Active,
            CheckFailed::InterfacesUnversioned(message) => {
                ControllerStatus::Waiting(message.clone())
            }
            CheckFailed::InterfacesIncompatible(message) => {
                ControllerStatus::Blocked(message.clone())
            }
            CheckFailed::ImageUnresolvable { message, status } => {
                status.with_message(message.clone())
            }
        }
    }

    /// Short name used in logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            CheckFailed::NotLeader => "not_leader",
            CheckFailed::InterfacesUnversioned(_) => "interfaces_unversioned",
            CheckFailed::InterfacesIncompatible(_) => "interfaces_incompatible",
            CheckFailed::ImageUnresolvable { .. } => "image_unresolvable",
        }
    }
}
