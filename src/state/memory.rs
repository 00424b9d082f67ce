//! In-memory state backend for tests.

use super::{ControllerState, StateError, StateStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// State backend that keeps everything in process memory
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    state: Mutex<ControllerState>,
    saves: AtomicUsize,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already persisted state, as after a restart
    pub fn with_state(state: ControllerState) -> Self {
        Self {
            state: Mutex::new(state),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of times state was written
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    /// Snapshot of the stored state
    pub async fn snapshot(&self) -> ControllerState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self) -> Result<ControllerState, StateError> {
        Ok(self.state.lock().await.clone())
    }

    async fn save(&self, state: &ControllerState) -> Result<(), StateError> {
        *self.state.lock().await = state.clone();
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
