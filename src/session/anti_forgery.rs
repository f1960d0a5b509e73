// src/session/anti_forgery.rs
use crate::clock::{to_millis, Clock};
use crate::error::PilotResult;
use crate::storage::{keys, KeyValueStore};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingState {
    value: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    issued_at: DateTime<Utc>,
}

/// The OAuth `state` value issued on login, checked once on callback.
pub struct AntiForgeryStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl AntiForgeryStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Generate and persist a fresh state value, replacing any pending one
    pub async fn issue(&self) -> PilotResult<String> {
        let pending = PendingState {
            value: Uuid::new_v4().simple().to_string(),
            issued_at: to_millis(self.clock.now()),
        };
        self.store
            .set(keys::OAUTH_STATE, &serde_json::to_string(&pending)?)
            .await?;
        debug!("Issued OAuth state");
        Ok(pending.value)
    }

    /// The pending value, unless it is missing, unreadable or stale.
    pub async fn pending(&self) -> PilotResult<Option<String>> {
        let Some(raw) = self.store.get(keys::OAUTH_STATE).await? else {
            return Ok(None);
        };

        let pending: PendingState = match serde_json::from_str(&raw) {
            Ok(pending) => pending,
            Err(e) => {
                warn!("Discarding unreadable OAuth state: {}", e);
                self.clear().await?;
                return Ok(None);
            }
        };

        if self.clock.now() - pending.issued_at > self.ttl {
            debug!("OAuth state expired");
            self.clear().await?;
            return Ok(None);
        }

        Ok(Some(pending.value))
    }

    pub async fn matches(&self, state: Option<&str>) -> PilotResult<bool> {
        let Some(state) = state.filter(|s| !s.is_empty()) else {
            return Ok(false);
        };
        Ok(self.pending().await?.as_deref() == Some(state))
    }

    pub async fn clear(&self) -> PilotResult<()> {
        self.store.remove(keys::OAUTH_STATE).await
    }
}
