// src/session/token_store.rs
use crate::clock::{to_millis, Clock};
use crate::error::PilotResult;
use crate::github::Profile;
use crate::storage::{keys, KeyValueStore};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub token_type: String,
    pub user: Profile,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Sole owner of the session slot. A session never leaves this type without
/// an expiry check; expired or unreadable sessions are deleted on read.
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub async fn load(&self) -> PilotResult<Option<Session>> {
        let Some(raw) = self.store.get(keys::SESSION).await? else {
            debug!("No session found in storage");
            return Ok(None);
        };

        let session: Session = match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(e) => {
                warn!("Discarding unreadable session: {}", e);
                self.clear().await?;
                return Ok(None);
            }
        };

        if session.is_expired_at(self.clock.now()) {
            info!("Session for {} expired, clearing", session.user.login);
            self.clear().await?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Store a fresh session expiring one TTL from now
    pub async fn save(
        &self,
        token: &str,
        token_type: &str,
        user: Profile,
    ) -> PilotResult<Session> {
        let session = Session {
            token: token.to_string(),
            token_type: token_type.to_string(),
            user,
            expires_at: to_millis(self.clock.now() + self.ttl),
        };

        self.store
            .set(keys::SESSION, &serde_json::to_string(&session)?)
            .await?;
        info!("Session stored for {}", session.user.login);
        Ok(session)
    }

    /// Valid token, if any. Storage failures read as "no token".
    pub async fn token(&self) -> Option<String> {
        match self.load().await {
            Ok(session) => session.map(|s| s.token),
            Err(e) => {
                warn!("Failed to read session token: {}", e);
                None
            }
        }
    }

    pub async fn clear(&self) -> PilotResult<()> {
        self.store.remove(keys::SESSION).await
    }
}
