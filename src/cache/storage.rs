//! SQLite-backed transient store.

use chrono::{Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::traits::TransientStore;

/// Schema for the transient table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS transients (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    -- unix seconds
    expires_at INTEGER NOT NULL
);
"#;

pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the cache database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;
    Self::from_connection(conn)
  }

  /// A private database that lives as long as this value.
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory cache: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("appointment-updater").join("cache.db"))
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  fn run_migrations(&self) -> Result<()> {
    self
      .lock()?
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))
  }
}

impl TransientStore for SqliteStorage {
  fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    let conn = self.lock()?;

    let row: Option<(Vec<u8>, i64)> = conn
      .query_row(
        "SELECT value, expires_at FROM transients WHERE key = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read transient {}: {}", key, e))?;

    let Some((data, expires_at)) = row else {
      return Ok(None);
    };

    if Utc::now().timestamp() >= expires_at {
      conn
        .execute("DELETE FROM transients WHERE key = ?", params![key])
        .map_err(|e| eyre!("Failed to delete expired transient {}: {}", key, e))?;
      return Ok(None);
    }

    let value = serde_json::from_slice(&data)
      .map_err(|e| eyre!("Failed to deserialize transient {}: {}", key, e))?;
    Ok(Some(value))
  }

  fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
    let data =
      serde_json::to_vec(value).map_err(|e| eyre!("Failed to serialize transient: {}", e))?;
    let expires_at = (Utc::now() + ttl).timestamp();

    self
      .lock()?
      .execute(
        "INSERT OR REPLACE INTO transients (key, value, expires_at) VALUES (?, ?, ?)",
        params![key, data, expires_at],
      )
      .map_err(|e| eyre!("Failed to store transient {}: {}", key, e))?;
    Ok(())
  }

  fn delete(&self, key: &str) -> Result<()> {
    self
      .lock()?
      .execute("DELETE FROM transients WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to delete transient {}: {}", key, e))?;
    Ok(())
  }
}
