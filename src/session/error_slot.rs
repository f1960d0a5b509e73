// src/session/error_slot.rs
use crate::error::{AuthError, PilotResult};
use crate::storage::{keys, KeyValueStore};
use std::sync::Arc;
use tracing::warn;

/// Last auth error, kept so it can be shown on the next page load.
pub struct AuthErrorSlot {
    store: Arc<dyn KeyValueStore>,
}

impl AuthErrorSlot {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn store(&self, error: &AuthError) -> PilotResult<()> {
        self.store
            .set(keys::AUTH_ERROR, &serde_json::to_string(error)?)
            .await
    }

    pub async fn load(&self) -> Option<AuthError> {
        match self.store.get(keys::AUTH_ERROR).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read stored auth error: {}", e);
                None
            }
        }
    }

    pub async fn clear(&self) -> PilotResult<()> {
        self.store.remove(keys::AUTH_ERROR).await
    }
}
