//! SQLite schema migrations.

use rusqlite::Connection;

use crate::error::StoreResult;

/// Run all database migrations.
pub fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    run_migration(conn, "001_ticker_cache", CREATE_TICKER_CACHE_TABLE)?;
    run_migration(conn, "002_rate_limits", CREATE_RATE_LIMITS_TABLE)?;
    run_migration(conn, "003_pipeline_checkpoints", CREATE_CHECKPOINTS_TABLE)?;

    tracing::debug!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> StoreResult<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_TICKER_CACHE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS ticker_cache (
    ticker TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    cached_at_ms INTEGER NOT NULL,
    expires_at_ms INTEGER NOT NULL,
    hit_count INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_ticker_cache_expires ON ticker_cache(expires_at_ms);
";

const CREATE_RATE_LIMITS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS rate_limits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    ticker TEXT NOT NULL,
    tool_name TEXT NOT NULL,
    timestamp_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_rate_limits_session
    ON rate_limits(session_id, tool_name, timestamp_ms);
CREATE INDEX IF NOT EXISTS idx_rate_limits_timestamp ON rate_limits(timestamp_ms);
";

const CREATE_CHECKPOINTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS pipeline_checkpoints (
    correlation_id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    ticker TEXT NOT NULL,
    status TEXT NOT NULL,
    state_json TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL,
    updated_at_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_checkpoints_status ON pipeline_checkpoints(status);
";
