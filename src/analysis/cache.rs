// src/analysis/cache.rs
use super::types::{PortfolioAnalysis, UserInput};
use crate::clock::{to_millis, Clock};
use crate::error::PilotResult;
use crate::storage::{keys, KeyValueStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAnalysisRecord {
    pub analysis: PortfolioAnalysis,
    pub user_input: UserInput,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub username: String,
}

/// Single-slot store for the latest portfolio analysis. Saves replace the
/// whole record; no expiry is enforced here.
pub struct AnalysisCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl AnalysisCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn save(
        &self,
        analysis: &PortfolioAnalysis,
        input: &UserInput,
    ) -> PilotResult<StoredAnalysisRecord> {
        let record = StoredAnalysisRecord {
            analysis: analysis.clone(),
            user_input: input.clone(),
            timestamp: to_millis(self.clock.now()),
            username: input.username.clone(),
        };
        self.store
            .set(keys::ANALYSIS, &serde_json::to_string(&record)?)
            .await?;
        info!("Analysis saved for {}", record.username);
        Ok(record)
    }

    /// Last saved record; unreadable records read as absent.
    pub async fn load(&self) -> PilotResult<Option<StoredAnalysisRecord>> {
        let Some(raw) = self.store.get(keys::ANALYSIS).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Failed to load analysis: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn has_stored(&self) -> bool {
        matches!(self.store.get(keys::ANALYSIS).await, Ok(Some(_)))
    }

    pub async fn clear(&self) -> PilotResult<()> {
        self.store.remove(keys::ANALYSIS).await?;
        info!("Analysis cleared");
        Ok(())
    }

    pub async fn age_description(&self) -> PilotResult<Option<String>> {
        let Some(record) = self.load().await? else {
            return Ok(None);
        };
        Ok(Some(describe_age(self.clock.now() - record.timestamp)))
    }
}

fn describe_age(age: chrono::Duration) -> String {
    let hours = age.num_hours();
    let days = hours / 24;
    let plural = |n: i64| if n > 1 { "s" } else { "" };

    if days > 0 {
        format!("{} day{} ago", days, plural(days))
    } else if hours > 0 {
        format!("{} hour{} ago", hours, plural(hours))
    } else {
        "Less than an hour ago".to_string()
    }
}
