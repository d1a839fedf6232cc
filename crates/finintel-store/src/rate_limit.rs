//! Sliding-window rate limiter backed by the `rate_limits` ledger.
//!
//! A request is allowed iff fewer than `max_calls` records exist for the
//! `(session_id, tool_name)` pair with a timestamp inside the trailing
//! window. Checking does not record a call; [`RateLimiter::acquire`] checks
//! and records in one immediate transaction, so concurrent callers cannot
//! overrun the window.

use std::sync::Arc;
use std::time::Duration;

use finintel_core::{Clock, TickerSymbol, ToolName};
use rusqlite::{params, Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::Database;
use crate::error::StoreResult;

/// `[rate_limit]` config section.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_max_calls")]
    pub max_calls: u32,
    /// Records older than this are reclaimable.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_calls() -> u32 {
    30
}

fn default_retention_secs() -> u64 {
    3600
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_calls: default_max_calls(),
            retention_secs: default_retention_secs(),
        }
    }
}

/// Outcome of [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub count_in_window: u32,
    pub max_calls: u32,
    /// Seconds until the oldest in-window call leaves the window; 0 when allowed.
    pub retry_after_seconds: u64,
}

/// A call recorded by [`RateLimiter::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    id: i64,
}

pub struct RateLimiter {
    db: Database,
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(db: Database, clock: Arc<dyn Clock>, config: RateLimitConfig) -> Self {
        Self { db, clock, config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn window_ms(&self) -> i64 {
        (self.config.window_secs as i64).saturating_mul(1000)
    }

    pub fn check(&self, session_id: &str, tool: ToolName) -> StoreResult<RateLimitDecision> {
        let conn = self.db.conn()?;
        self.decide(&conn, session_id, tool, self.clock.now_ms())
    }

    /// Check and, when allowed, record one call atomically.
    ///
    /// The returned [`Reservation`] is the recorded call; hand it back to
    /// [`RateLimiter::release`] if the upstream was never reached.
    pub fn acquire(
        &self,
        session_id: &str,
        ticker: &TickerSymbol,
        tool: ToolName,
    ) -> StoreResult<(RateLimitDecision, Option<Reservation>)> {
        let now = self.clock.now_ms();
        let mut conn = self.db.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let decision = self.decide(&tx, session_id, tool, now)?;
        if !decision.allowed {
            tx.commit()?;
            return Ok((decision, None));
        }
        tx.execute(
            "INSERT INTO rate_limits (session_id, ticker, tool_name, timestamp_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![session_id, ticker.as_str(), tool.as_str(), now],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok((decision, Some(Reservation { id })))
    }

    /// Drop a reserved call. Returns whether the record still existed.
    pub fn release(&self, reservation: Reservation) -> StoreResult<bool> {
        let conn = self.db.conn()?;
        let removed = conn.execute(
            "DELETE FROM rate_limits WHERE id = ?1",
            params![reservation.id],
        )?;
        Ok(removed == 1)
    }

    fn decide(
        &self,
        conn: &Connection,
        session_id: &str,
        tool: ToolName,
        now: i64,
    ) -> StoreResult<RateLimitDecision> {
        let window_ms = self.window_ms();
        let (count, oldest): (i64, Option<i64>) = conn.query_row(
            "SELECT COUNT(*), MIN(timestamp_ms) FROM rate_limits
             WHERE session_id = ?1 AND tool_name = ?2 AND timestamp_ms > ?3",
            params![session_id, tool.as_str(), now - window_ms],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let count = count.max(0) as u32;
        let allowed = count < self.config.max_calls;
        let retry_after_seconds = match (allowed, oldest) {
            (false, Some(oldest)) => ((oldest + window_ms - now).max(0) / 1000) as u64 + 1,
            _ => 0,
        };

        debug!(
            session_id,
            tool = tool.as_str(),
            count,
            allowed,
            "Rate limit checked"
        );
        Ok(RateLimitDecision {
            allowed,
            count_in_window: count,
            max_calls: self.config.max_calls,
            retry_after_seconds,
        })
    }

    /// Append one call record at the current time.
    pub fn record(&self, session_id: &str, ticker: &TickerSymbol, tool: ToolName) -> StoreResult<()> {
        let now = self.clock.now_ms();
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO rate_limits (session_id, ticker, tool_name, timestamp_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![session_id, ticker.as_str(), tool.as_str(), now],
        )?;
        Ok(())
    }

    /// Delete records older than `retention`. Returns rows removed.
    pub fn purge_older_than(&self, retention: Duration) -> StoreResult<usize> {
        let cutoff = self.clock.now_ms() - retention.as_millis() as i64;
        let conn = self.db.conn()?;
        let removed = conn.execute(
            "DELETE FROM rate_limits WHERE timestamp_ms < ?1",
            params![cutoff],
        )?;
        Ok(removed)
    }

    /// Purge using the configured retention.
    pub fn purge_expired(&self) -> StoreResult<usize> {
        self.purge_older_than(Duration::from_secs(self.config.retention_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finintel_core::ManualClock;

    const T0: i64 = 1_700_000_000_000;

    fn limiter() -> (tempfile::TempDir, Arc<ManualClock>, RateLimiter) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_path(&dir.path().join("rl.db")).unwrap();
        let clock = Arc::new(ManualClock::new(T0));
        let limiter = RateLimiter::new(db, clock.clone(), RateLimitConfig::default());
        (dir, clock, limiter)
    }

    fn aapl() -> TickerSymbol {
        TickerSymbol::parse("AAPL").unwrap()
    }

    #[test]
    fn test_check_does_not_count() {
        let (_dir, _clock, limiter) = limiter();
        for _ in 0..100 {
            assert!(limiter.check("s1", ToolName::GetMarketData).unwrap().allowed);
        }
    }

    #[test]
    fn test_thirtieth_call_exhausts_window() {
        let (_dir, _clock, limiter) = limiter();
        for _ in 0..29 {
            limiter.record("s1", &aapl(), ToolName::GetMarketData).unwrap();
        }
        let d = limiter.check("s1", ToolName::GetMarketData).unwrap();
        assert!(d.allowed);
        assert_eq!(d.count_in_window, 29);

        limiter.record("s1", &aapl(), ToolName::GetMarketData).unwrap();
        let d = limiter.check("s1", ToolName::GetMarketData).unwrap();
        assert!(!d.allowed);
        assert_eq!(d.count_in_window, 30);
        assert_eq!(d.retry_after_seconds, 61);
    }

    #[test]
    fn test_window_slides() {
        let (_dir, clock, limiter) = limiter();
        for _ in 0..30 {
            limiter.record("s1", &aapl(), ToolName::GetMarketData).unwrap();
        }
        clock.advance(Duration::from_secs(45));
        let d = limiter.check("s1", ToolName::GetMarketData).unwrap();
        assert!(!d.allowed);
        assert_eq!(d.retry_after_seconds, 16);

        clock.advance(Duration::from_secs(15));
        let d = limiter.check("s1", ToolName::GetMarketData).unwrap();
        assert!(d.allowed);
        assert_eq!(d.count_in_window, 0);
    }

    #[test]
    fn test_scoped_by_session_and_tool() {
        let (_dir, _clock, limiter) = limiter();
        for _ in 0..30 {
            limiter.record("s1", &aapl(), ToolName::GetMarketData).unwrap();
        }
        assert!(!limiter.check("s1", ToolName::GetMarketData).unwrap().allowed);
        assert!(limiter.check("s2", ToolName::GetMarketData).unwrap().allowed);
        assert!(limiter.check("s1", ToolName::CheckSuitability).unwrap().allowed);
    }

    #[test]
    fn test_acquire_records_until_window_is_full() {
        let (_dir, _clock, limiter) = limiter();
        for i in 0..30 {
            let (d, slot) = limiter.acquire("s1", &aapl(), ToolName::GetMarketData).unwrap();
            assert!(d.allowed);
            assert_eq!(d.count_in_window, i);
            assert!(slot.is_some());
        }
        let (d, slot) = limiter.acquire("s1", &aapl(), ToolName::GetMarketData).unwrap();
        assert!(!d.allowed);
        assert!(slot.is_none());
        assert_eq!(d.retry_after_seconds, 61);
    }

    #[test]
    fn test_release_frees_the_slot() {
        let (_dir, _clock, limiter) = limiter();
        for _ in 0..29 {
            limiter.record("s1", &aapl(), ToolName::GetMarketData).unwrap();
        }
        let (_, slot) = limiter.acquire("s1", &aapl(), ToolName::GetMarketData).unwrap();
        let slot = slot.unwrap();
        assert!(!limiter.check("s1", ToolName::GetMarketData).unwrap().allowed);

        assert!(limiter.release(slot).unwrap());
        assert!(!limiter.release(slot).unwrap());
        assert_eq!(limiter.check("s1", ToolName::GetMarketData).unwrap().count_in_window, 29);
    }

    #[test]
    fn test_purge_respects_retention() {
        let (_dir, clock, limiter) = limiter();
        limiter.record("s1", &aapl(), ToolName::GetMarketData).unwrap();
        clock.advance(Duration::from_secs(1800));
        limiter.record("s1", &aapl(), ToolName::GetMarketData).unwrap();

        clock.advance(Duration::from_secs(1801));
        assert_eq!(limiter.purge_expired().unwrap(), 1);
        assert_eq!(limiter.purge_expired().unwrap(), 0);
    }
}
