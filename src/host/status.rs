//! # Controller Status
//!
//! The single externally observed field reflecting the outcome of the last
//! reconciliation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a status, without its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Active,
    Waiting,
    Blocked,
    Maintenance,
}

impl StatusKind {
    /// Lowercase name used in metrics labels and the status config map
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Active => "active",
            StatusKind::Waiting => "waiting",
            StatusKind::Blocked => "blocked",
            StatusKind::Maintenance => "maintenance",
        }
    }

    /// Attach a message; `Active` never carries one
    pub fn with_message(self, message: impl Into<String>) -> ControllerStatus {
        match self {
            StatusKind::Active => ControllerStatus::Active,
            StatusKind::Waiting => ControllerStatus::Waiting(message.into()),
            StatusKind::Blocked => ControllerStatus::Blocked(message.into()),
            StatusKind::Maintenance => ControllerStatus::Maintenance(message.into()),
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally visible controller status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerStatus {
    Active,
    Waiting(String),
    Blocked(String),
    Maintenance(String),
}

impl ControllerStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            ControllerStatus::Active => StatusKind::Active,
            ControllerStatus::Waiting(_) => StatusKind::Waiting,
            ControllerStatus::Blocked(_) => StatusKind::Blocked,
            ControllerStatus::Maintenance(_) => StatusKind::Maintenance,
        }
    }

    /// Human-readable message; `None` for `Active`
    pub fn message(&self) -> Option<&str> {
        match self {
            ControllerStatus::Active => None,
            ControllerStatus::Waiting(m)
            | ControllerStatus::Blocked(m)
            | ControllerStatus::Maintenance(m) => Some(m),
        }
    }
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) if !message.is_empty() => write!(f, "{}: {message}", self.kind()),
            _ => write!(f, "{}", self.kind()),
        }
    }
}
