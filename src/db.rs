use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::session::SessionStore;

/// A saved shortcut: a button label and the command it triggers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    pub name: String,
    pub command: String,
}

/// Handle to the bot database
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file and bootstrap the schema
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        init_database_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// A private in-memory database with the schema applied
    pub async fn in_memory() -> Result<Self> {
        // A single connection that never expires, otherwise the memory database is lost
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        init_database_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn sessions(&self) -> SessionStore {
        SessionStore::new(self.pool.clone())
    }
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &SqlitePool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS UserSession (
            chat_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            command TEXT NOT NULL DEFAULT '',
            listening BOOLEAN NOT NULL DEFAULT 0,
            PRIMARY KEY (chat_id, user_id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create UserSession table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS Shortcuts (
            user_id INTEGER PRIMARY KEY,
            command_list TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create Shortcuts table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS CatGPT (
            user_id INTEGER PRIMARY KEY,
            settings_json TEXT NOT NULL
        ) WITHOUT ROWID",
    )
    .execute(pool)
    .await
    .context("Failed to create CatGPT table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Read the saved shortcuts of a user, oldest first
pub async fn get_shortcuts(pool: &SqlitePool, user_id: i64) -> Result<Vec<Shortcut>> {
    debug!(user_id, "Reading shortcuts");

    let row: Option<(String,)> =
        sqlx::query_as("SELECT command_list FROM Shortcuts WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .context("Failed to read shortcuts")?;

    match row {
        Some((json,)) => serde_json::from_str(&json).context("Stored shortcut list is corrupt"),
        None => Ok(Vec::new()),
    }
}

/// Replace the saved shortcuts of a user; an empty list removes the row
pub async fn save_shortcuts(pool: &SqlitePool, user_id: i64, shortcuts: &[Shortcut]) -> Result<()> {
    if shortcuts.is_empty() {
        debug!(user_id, "Removing shortcut list");
        sqlx::query("DELETE FROM Shortcuts WHERE user_id = ?1")
            .bind(user_id)
            .execute(pool)
            .await
            .context("Failed to delete shortcuts")?;
        return Ok(());
    }

    let json = serde_json::to_string(shortcuts).context("Failed to serialize shortcuts")?;
    debug!(user_id, count = shortcuts.len(), "Saving shortcut list");

    sqlx::query(
        "INSERT INTO Shortcuts (user_id, command_list) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET command_list = excluded.command_list",
    )
    .bind(user_id)
    .bind(json)
    .execute(pool)
    .await
    .context("Failed to save shortcuts")?;

    Ok(())
}

/// Read the raw CatGPT settings JSON of a user
pub async fn get_catgpt_settings(pool: &SqlitePool, user_id: i64) -> Result<Option<String>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT settings_json FROM CatGPT WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .context("Failed to read CatGPT settings")?;

    Ok(row.map(|(json,)| json))
}

/// Store the raw CatGPT settings JSON of a user
pub async fn put_catgpt_settings(pool: &SqlitePool, user_id: i64, settings_json: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO CatGPT (user_id, settings_json) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET settings_json = excluded.settings_json",
    )
    .bind(user_id)
    .bind(settings_json)
    .execute(pool)
    .await
    .context("Failed to save CatGPT settings")?;

    Ok(())
}
