//! # Secret Store
//!
//! Hands out the controller's generated secret key, creating it exactly once.

use super::{StateError, StateStore};
use crate::constants::{SECRET_KEY_ALPHABET, SECRET_KEY_LENGTH};
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Generate a fresh secret key from the OS-seeded thread RNG
pub fn generate_secret_key() -> String {
    generate_secret_key_with(&mut rand::rng())
}

/// Generate a secret key: a uniform draw of [`SECRET_KEY_LENGTH`] characters from
/// uppercase letters and digits (36^30, about 155 bits)
pub fn generate_secret_key_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SECRET_KEY_LENGTH)
        .map(|_| char::from(SECRET_KEY_ALPHABET[rng.random_range(0..SECRET_KEY_ALPHABET.len())]))
        .collect()
}

/// Owner of the persisted secret key
#[derive(Clone)]
pub struct SecretStore {
    backend: Arc<dyn StateStore>,
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore").finish_non_exhaustive()
    }
}

impl SecretStore {
    pub fn new(backend: Arc<dyn StateStore>) -> Self {
        Self { backend }
    }

    /// Return the persisted secret key, generating and persisting it on first call
    ///
    /// Subsequent calls, including after a restart, return the same value. Only
    /// the backend can fail; the in-memory backend never does.
    pub async fn get_or_create_secret(&self) -> Result<String, StateError> {
        let mut state = self.backend.load().await?;
        if let Some(secret_key) = state.secret_key.as_ref().filter(|key| !key.is_empty()) {
            debug!("Using persisted secret key");
            return Ok(secret_key.clone());
        }

        let secret_key = generate_secret_key();
        state.secret_key = Some(secret_key.clone());
        self.backend.save(&state).await?;
        info!("Generated and persisted a new secret key");
        Ok(secret_key)
    }
}
