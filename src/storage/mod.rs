// src/storage/mod.rs
//! Durable key-value slots shared by every page load.
//!
//! Each slot is owned by exactly one service (token store, auth-error slot,
//! anti-forgery state, analysis cache). Writes are whole-value replacements, so
//! concurrent writers resolve last-write-wins. Readers pick up another run's
//! writes on their next page load.

pub mod sqlite;

use crate::error::PilotResult;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub use sqlite::SqliteStore;

pub mod keys {
    pub const SESSION: &str = "github_token";
    pub const AUTH_ERROR: &str = "github_auth_error";
    pub const ANALYSIS: &str = "portfolio_analysis";
    pub const OAUTH_STATE: &str = "github_oauth_state";
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PilotResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> PilotResult<()>;
    async fn remove(&self, key: &str) -> PilotResult<()>;
}

/// In-process store, used for tests and for data that must not outlive the run.
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> PilotResult<Option<String>> {
        Ok(self.slots.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> PilotResult<()> {
        self.slots
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> PilotResult<()> {
        self.slots.write().await.remove(key);
        Ok(())
    }
}
