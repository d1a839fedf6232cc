//! Pooled SQLite connections.

use std::path::{Path, PathBuf};
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use serde::Deserialize;
use tracing::info;

use crate::error::StoreResult;
use crate::migrations::run_migrations;

pub type SqlitePool = Pool<SqliteConnectionManager>;
pub type SqliteConnection = PooledConnection<SqliteConnectionManager>;

/// `[store]` config section.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_path")]
    pub path: PathBuf,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_path() -> PathBuf {
    PathBuf::from("data/finintel.db")
}

fn default_pool_size() -> u32 {
    8
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// Shared handle to the gateway database. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file and apply migrations.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let manager = SqliteConnectionManager::file(&config.path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            Ok(())
        });
        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .build(manager)?;

        let db = Self { pool };
        {
            let conn = db.conn()?;
            run_migrations(&conn)?;
        }
        info!(path = %config.path.display(), "Database opened");
        Ok(db)
    }

    /// Open with default pool settings at `path`.
    pub fn open_path(path: &Path) -> StoreResult<Self> {
        Self::open(&StoreConfig {
            path: path.to_path_buf(),
            ..StoreConfig::default()
        })
    }

    pub fn conn(&self) -> StoreResult<SqliteConnection> {
        Ok(self.pool.get()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_parent_dirs_and_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/finintel.db");
        let db = Database::open_path(&path).unwrap();
        assert!(path.exists());

        let conn = db.conn().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('ticker_cache', 'rate_limits', 'pipeline_checkpoints')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn test_single_connection_pool_is_usable_after_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&StoreConfig {
            path: dir.path().join("single.db"),
            pool_size: 1,
            ..StoreConfig::default()
        })
        .unwrap();

        let conn = db.conn().unwrap();
        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert!(applied > 0);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finintel.db");
        Database::open_path(&path).unwrap();
        Database::open_path(&path).unwrap();
    }
}
