//! # Controller State
//!
//! Persisted, process-wide state of the controller and the secret store built on it.
//!
//! The state holds the generated secret key and the operator version that last
//! started. The key is created on first use, survives restarts through a
//! [`StateStore`] backend, and is never regenerated once set.

mod memory;
mod secret_store;

pub use memory::InMemoryStateStore;
pub use secret_store::{generate_secret_key, generate_secret_key_with, SecretStore};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// State persisted across controller restarts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerState {
    /// Generated secret key; `None` until first generated
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Operator version recorded after the last successful startup
    #[serde(default)]
    pub operator_version: Option<String>,
}

/// Errors raised by a state backend
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to load controller state: {0}")]
    Load(String),
    #[error("failed to save controller state: {0}")]
    Save(String),
}

/// Persistence backend for [`ControllerState`]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the current state; a missing state is returned as the default value
    async fn load(&self) -> Result<ControllerState, StateError>;

    /// Persist the given state, replacing whatever was stored
    ///
    /// Callers load first and save the whole state back so unrelated fields survive.
    async fn save(&self, state: &ControllerState) -> Result<(), StateError>;
}
