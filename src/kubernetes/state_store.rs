//! # Secret State Store
//!
//! Persists [`ControllerState`] in a Kubernetes `Secret`.

use super::{is_not_found, owned_labels};
use crate::config::ControllerConfig;
use crate::constants::{FIELD_MANAGER, STATE_OPERATOR_VERSION_KEY, STATE_SECRET_KEY};
use crate::state::{ControllerState, StateError, StateStore};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::{Api, ObjectMeta, Patch, PatchParams};
use kube::Client;
use std::collections::BTreeMap;
use tracing::debug;

pub struct SecretStateStore {
    secrets: Api<Secret>,
    name: String,
    app_name: String,
}

impl std::fmt::Debug for SecretStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStateStore")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SecretStateStore {
    pub fn new(client: Client, config: &ControllerConfig) -> Self {
        Self {
            secrets: Api::namespaced(client, &config.namespace),
            name: config.state_secret_name(),
            app_name: config.app_name.clone(),
        }
    }
}

fn read_field(secret: &Secret, key: &str) -> Result<Option<String>, StateError> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|value| {
            String::from_utf8(value.0.clone())
                .map_err(|e| StateError::Load(format!("'{key}' is not UTF-8: {e}")))
        })
        .transpose()
}

/// Read the state out of the secret's data
pub(crate) fn state_from_secret(secret: &Secret) -> Result<ControllerState, StateError> {
    Ok(ControllerState {
        secret_key: read_field(secret, STATE_SECRET_KEY)?,
        operator_version: read_field(secret, STATE_OPERATOR_VERSION_KEY)?,
    })
}

/// Secret data for the state; unset fields are left out
pub(crate) fn secret_data(state: &ControllerState) -> BTreeMap<String, ByteString> {
    [
        (STATE_SECRET_KEY, &state.secret_key),
        (STATE_OPERATOR_VERSION_KEY, &state.operator_version),
    ]
    .into_iter()
    .filter_map(|(key, value)| {
        value
            .as_ref()
            .map(|value| (key.to_string(), ByteString(value.as_bytes().to_vec())))
    })
    .collect()
}

#[async_trait]
impl StateStore for SecretStateStore {
    async fn load(&self) -> Result<ControllerState, StateError> {
        match self.secrets.get(&self.name).await {
            Ok(secret) => state_from_secret(&secret),
            Err(e) if is_not_found(&e) => {
                debug!(secret = %self.name, "State secret not found, starting with empty state");
                Ok(ControllerState::default())
            }
            Err(e) => Err(StateError::Load(e.to_string())),
        }
    }

    async fn save(&self, state: &ControllerState) -> Result<(), StateError> {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                labels: Some(owned_labels(&self.app_name)),
                ..Default::default()
            },
            data: Some(secret_data(state)),
            ..Default::default()
        };

        self.secrets
            .patch(&self.name, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&secret))
            .await
            .map_err(|e| StateError::Save(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_secret_reads_key() {
        let secret = Secret {
            data: Some(BTreeMap::from([(
                STATE_SECRET_KEY.to_string(),
                ByteString(b"ABC123".to_vec()),
            )])),
            ..Default::default()
        };
        let state = state_from_secret(&secret).unwrap();
        assert_eq!(state.secret_key.as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_secret_data_carries_every_set_field() {
        let state = ControllerState {
            secret_key: Some("ABC123".to_string()),
            operator_version: Some("0.2.0".to_string()),
        };
        let data = secret_data(&state);
        assert_eq!(data[STATE_OPERATOR_VERSION_KEY], ByteString(b"0.2.0".to_vec()));

        let secret = Secret {
            data: Some(data),
            ..Default::default()
        };
        assert_eq!(state_from_secret(&secret).unwrap(), state);
    }

    #[test]
    fn test_unset_fields_are_left_out() {
        let data = secret_data(&ControllerState::default());
        assert!(data.is_empty());
    }

    #[test]
    fn test_state_from_secret_without_data_is_empty() {
        let state = state_from_secret(&Secret::default()).unwrap();
        assert_eq!(state, ControllerState::default());
    }

    #[test]
    fn test_state_from_secret_rejects_non_utf8() {
        let secret = Secret {
            data: Some(BTreeMap::from([(
                STATE_SECRET_KEY.to_string(),
                ByteString(vec![0xff, 0xfe]),
            )])),
            ..Default::default()
        };
        assert!(matches!(state_from_secret(&secret), Err(StateError::Load(_))));
    }
}
