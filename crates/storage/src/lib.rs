use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use url::Url;

use shared::store::ConsentStore;

/// SQLite-backed key/value items partitioned by page origin.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredItem {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every sqlite connection opens its own private in-memory database.
        let max_connections = if database_url.starts_with("sqlite::memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        let storage = Self { pool };
        storage.ensure_items_table().await?;
        Ok(storage)
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_items_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS origin_items (
                origin     TEXT NOT NULL,
                item_key   TEXT NOT NULL,
                item_value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (origin, item_key)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure origin_items table exists")?;
        Ok(())
    }

    /// Scopes the store to `origin`, accepting either a bare origin or any page URL on it.
    pub fn for_origin(&self, origin: &str) -> Result<OriginStore> {
        Ok(OriginStore {
            storage: self.clone(),
            origin: normalize_origin(origin)?,
        })
    }

    pub async fn get_item(&self, origin: &str, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT item_value FROM origin_items WHERE origin = ? AND item_key = ?")
            .bind(origin)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read item '{key}' for origin '{origin}'"))?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    pub async fn set_item(&self, origin: &str, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO origin_items (origin, item_key, item_value, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(origin, item_key) DO UPDATE SET
                item_value = excluded.item_value,
                updated_at = excluded.updated_at",
        )
        .bind(origin)
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write item '{key}' for origin '{origin}'"))?;
        Ok(())
    }

    pub async fn list_items(&self, origin: &str) -> Result<Vec<StoredItem>> {
        let rows = sqlx::query(
            "SELECT item_key, item_value, updated_at FROM origin_items
             WHERE origin = ? ORDER BY item_key",
        )
        .bind(origin)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<StoredItem> {
                Ok(StoredItem {
                    key: row.try_get("item_key")?,
                    value: row.try_get("item_value")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }
}

/// A [`Storage`] view bound to one origin, as a page sees its local storage.
#[derive(Clone)]
pub struct OriginStore {
    storage: Storage,
    origin: String,
}

impl OriginStore {
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub async fn list_items(&self) -> Result<Vec<StoredItem>> {
        self.storage.list_items(&self.origin).await
    }
}

#[async_trait]
impl ConsentStore for OriginStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.storage.get_item(&self.origin, key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        tracing::debug!(origin = %self.origin, key, value, "persisting origin item");
        self.storage.set_item(&self.origin, key, value).await
    }
}

fn normalize_origin(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid origin '{raw}'"))?;
    let origin = url.origin();
    if !origin.is_tuple() {
        anyhow::bail!("origin '{raw}' is opaque and cannot scope storage");
    }
    Ok(origin.ascii_serialization())
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
