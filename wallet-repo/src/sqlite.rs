//! SQLite dataset store adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::types::Json;
use std::str::FromStr;

use wallet_types::{Dataset, DatasetStore, RepoError};

use crate::types::DbDataset;

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Store
// ─────────────────────────────────────────────────────────────────────────────

/// Key-value store of JSON datasets backed by a single SQLite table.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a new SQLite store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let store = Self { pool };
        store.create_schema().await?;
        Ok(store)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_datasets.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl DatasetStore for SqliteStore {
    async fn load(&self, dataset: Dataset) -> Result<Option<serde_json::Value>, RepoError> {
        let row: Option<DbDataset> =
            sqlx::query_as(r#"SELECT body FROM datasets WHERE name = ?"#)
                .bind(dataset.key())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.map(|row| row.body.0))
    }

    async fn save(&self, dataset: Dataset, body: &serde_json::Value) -> Result<(), RepoError> {

        sqlx::query(
            r#"INSERT INTO datasets (name, body, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(name) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at"#,
        )
        .bind(dataset.key())
        .bind(Json(body))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}
