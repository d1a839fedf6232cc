//! Time-bounded ticker cache.
//!
//! Entries are keyed by ticker (not session scoped). Expiry is checked at
//! read time; expired rows stay on disk until [`CacheStore::sweep_expired`].

use std::sync::Arc;
use std::time::Duration;

use finintel_core::{Clock, TickerSymbol};
use finintel_telemetry::Metrics;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::Database;
use crate::error::StoreResult;

/// `[cache]` config section.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// A live cache entry returned by [`CacheStore::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPayload {
    pub payload: String,
    pub cached_at_ms: i64,
    pub expires_at_ms: i64,
    /// Hit count including the read that returned this value.
    pub hit_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerHits {
    pub ticker: String,
    pub hits: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_entries: i64,
    pub valid_entries: i64,
    pub expired_entries: i64,
    pub total_hits: i64,
    pub top_cached_tickers: Vec<TickerHits>,
    /// Average hits per stored entry.
    pub cache_hit_rate: f64,
}

pub struct CacheStore {
    db: Database,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl CacheStore {
    pub fn new(db: Database, clock: Arc<dyn Clock>, config: &CacheConfig) -> Self {
        Self {
            db,
            clock,
            default_ttl: config.ttl(),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a live entry, counting the hit in the same statement.
    pub fn get(&self, ticker: &TickerSymbol) -> StoreResult<Option<CachedPayload>> {
        let now = self.clock.now_ms();
        let conn = self.db.conn()?;
        let entry = conn
            .query_row(
                "UPDATE ticker_cache SET hit_count = hit_count + 1
                 WHERE ticker = ?1 AND expires_at_ms > ?2
                 RETURNING payload, cached_at_ms, expires_at_ms, hit_count",
                params![ticker.as_str(), now],
                |row| {
                    Ok(CachedPayload {
                        payload: row.get(0)?,
                        cached_at_ms: row.get(1)?,
                        expires_at_ms: row.get(2)?,
                        hit_count: row.get(3)?,
                    })
                },
            )
            .optional()?;

        match &entry {
            Some(e) => {
                Metrics::cache_hit();
                debug!(
                    ticker = %ticker,
                    age_secs = (now - e.cached_at_ms) / 1000,
                    ttl_remaining_secs = (e.expires_at_ms - now) / 1000,
                    hit_count = e.hit_count,
                    "Cache hit"
                );
            }
            None => {
                Metrics::cache_miss();
                debug!(ticker = %ticker, "Cache miss");
            }
        }
        Ok(entry)
    }

    /// Store `payload` for `ticker`, replacing any existing entry.
    pub fn put(
        &self,
        ticker: &TickerSymbol,
        payload: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let now = self.clock.now_ms();
        let expires_at = now.saturating_add(ttl.as_millis() as i64);
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO ticker_cache
                 (ticker, payload, cached_at_ms, expires_at_ms, hit_count)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![ticker.as_str(), payload, now, expires_at],
        )?;
        Metrics::cache_write();
        debug!(ticker = %ticker, ttl_secs = ttl.as_secs(), "Cache write");
        Ok(())
    }

    /// Remove the entry for `ticker`. Returns rows removed (0 when absent).
    pub fn invalidate(&self, ticker: &TickerSymbol) -> StoreResult<usize> {
        let conn = self.db.conn()?;
        let removed = conn.execute(
            "DELETE FROM ticker_cache WHERE ticker = ?1",
            params![ticker.as_str()],
        )?;
        if removed > 0 {
            info!(ticker = %ticker, "Cache entry invalidated");
        }
        Ok(removed)
    }

    /// Physically delete expired entries.
    pub fn sweep_expired(&self) -> StoreResult<usize> {
        let now = self.clock.now_ms();
        let conn = self.db.conn()?;
        let removed = conn.execute(
            "DELETE FROM ticker_cache WHERE expires_at_ms <= ?1",
            params![now],
        )?;
        Ok(removed)
    }

    pub fn stats(&self) -> StoreResult<CacheStats> {
        let now = self.clock.now_ms();
        let conn = self.db.conn()?;

        let (total, valid, total_hits): (i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN expires_at_ms > ?1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(hit_count), 0)
             FROM ticker_cache",
            params![now],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let mut stmt = conn.prepare(
            "SELECT ticker, hit_count FROM ticker_cache
             WHERE expires_at_ms > ?1
             ORDER BY hit_count DESC, ticker ASC
             LIMIT 10",
        )?;
        let top = stmt
            .query_map(params![now], |row| {
                Ok(TickerHits {
                    ticker: row.get(0)?,
                    hits: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let rate = total_hits as f64 / total.max(1) as f64;
        Ok(CacheStats {
            total_entries: total,
            valid_entries: valid,
            expired_entries: total - valid,
            total_hits,
            top_cached_tickers: top,
            cache_hit_rate: (rate * 100.0).round() / 100.0,
        })
    }
}
