// src/storage/sqlite.rs
use super::KeyValueStore;
use crate::error::PilotResult;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info};

/// Slot store backed by a SQLite file, shared across process runs.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `database_path`
    pub async fn open(database_path: &Path) -> PilotResult<Self> {
        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                crate::error::PilotError::Storage(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePool::connect(&database_url).await?;
        info!("Storage database opened: {}", database_path.display());

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory database. One connection, otherwise each pooled
    /// connection would see its own empty database.
    pub async fn in_memory() -> PilotResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> PilotResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS storage_slots (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("Storage migrations completed");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> PilotResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM storage_slots WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> PilotResult<()> {
        sqlx::query(
            r#"
            INSERT INTO storage_slots (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> PilotResult<()> {
        let result = sqlx::query("DELETE FROM storage_slots WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        debug!("Removed {} row(s) for slot {}", result.rows_affected(), key);
        Ok(())
    }
}
