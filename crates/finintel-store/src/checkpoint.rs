//! Persisted pipeline checkpoints.
//!
//! A run that reaches a pending human approval is stored as `pending`. A
//! decision claims it (`pending -> resolving`) in a single conditional
//! update, so a checkpoint is resumed at most once even under concurrent
//! submissions. A claim abandoned by a crashed process is returned to
//! `pending` by [`CheckpointStore::recover_stale`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use finintel_core::{Clock, CorrelationId};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use tracing::{debug, warn};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Pending,
    Resolving,
    Completed,
}

impl CheckpointStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolving => "resolving",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckpointStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "resolving" => Ok(Self::Resolving),
            "completed" => Ok(Self::Completed),
            other => Err(StoreError::InvalidState(format!(
                "unknown checkpoint status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    pub correlation_id: String,
    pub session_id: String,
    pub ticker: String,
    pub status: CheckpointStatus,
    pub state_json: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

const SELECT_COLUMNS: &str = "correlation_id, session_id, ticker, status, state_json, \
                              created_at_ms, updated_at_ms";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<(CheckpointRecord, String)> {
    let status: String = row.get(3)?;
    Ok((
        CheckpointRecord {
            correlation_id: row.get(0)?,
            session_id: row.get(1)?,
            ticker: row.get(2)?,
            status: CheckpointStatus::Pending,
            state_json: row.get(4)?,
            created_at_ms: row.get(5)?,
            updated_at_ms: row.get(6)?,
        },
        status,
    ))
}

fn finish(raw: (CheckpointRecord, String)) -> StoreResult<CheckpointRecord> {
    let (mut record, status) = raw;
    record.status = status.parse()?;
    Ok(record)
}

pub struct CheckpointStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl CheckpointStore {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Store a suspended run. Fails if the id already has a checkpoint.
    pub fn save_pending(
        &self,
        correlation_id: &CorrelationId,
        session_id: &str,
        ticker: &str,
        state_json: &str,
    ) -> StoreResult<()> {
        let now = self.clock.now_ms();
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO pipeline_checkpoints
                 (correlation_id, session_id, ticker, status, state_json, created_at_ms, updated_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                correlation_id.as_str(),
                session_id,
                ticker,
                CheckpointStatus::Pending.as_str(),
                state_json,
                now
            ],
        )?;
        Ok(())
    }

    /// Atomically move a pending checkpoint to `resolving` and return it.
    ///
    /// Returns `None` if no pending checkpoint exists for the id.
    pub fn claim_pending(&self, correlation_id: &CorrelationId) -> StoreResult<Option<CheckpointRecord>> {
        let now = self.clock.now_ms();
        let conn = self.db.conn()?;
        let sql = format!(
            "UPDATE pipeline_checkpoints SET status = ?1, updated_at_ms = ?2
             WHERE correlation_id = ?3 AND status = ?4
             RETURNING {SELECT_COLUMNS}"
        );
        let claimed = conn
            .query_row(
                &sql,
                params![
                    CheckpointStatus::Resolving.as_str(),
                    now,
                    correlation_id.as_str(),
                    CheckpointStatus::Pending.as_str()
                ],
                row_to_record,
            )
            .optional()?;
        claimed.map(finish).transpose()
    }

    /// Return a claimed checkpoint to `pending` (resume failed before deciding).
    pub fn release(&self, correlation_id: &CorrelationId) -> StoreResult<bool> {
        self.transition(
            correlation_id,
            CheckpointStatus::Resolving,
            CheckpointStatus::Pending,
            None,
        )
    }

    /// Mark a claimed checkpoint completed with its final state.
    pub fn complete(&self, correlation_id: &CorrelationId, state_json: &str) -> StoreResult<bool> {
        self.transition(
            correlation_id,
            CheckpointStatus::Resolving,
            CheckpointStatus::Completed,
            Some(state_json),
        )
    }

    fn transition(
        &self,
        correlation_id: &CorrelationId,
        from: CheckpointStatus,
        to: CheckpointStatus,
        state_json: Option<&str>,
    ) -> StoreResult<bool> {
        let now = self.clock.now_ms();
        let conn = self.db.conn()?;
        let updated = conn.execute(
            "UPDATE pipeline_checkpoints
             SET status = ?1, updated_at_ms = ?2, state_json = COALESCE(?3, state_json)
             WHERE correlation_id = ?4 AND status = ?5",
            params![to.as_str(), now, state_json, correlation_id.as_str(), from.as_str()],
        )?;
        Ok(updated == 1)
    }

    /// Return claims older than `lease` to `pending`. A zero lease recovers
    /// every claim, which is only safe while nothing is resolving.
    pub fn recover_stale(&self, lease: Duration) -> StoreResult<usize> {
        let now = self.clock.now_ms();
        let cutoff = now - lease.as_millis() as i64;
        let conn = self.db.conn()?;
        let recovered = conn.execute(
            "UPDATE pipeline_checkpoints SET status = ?1, updated_at_ms = ?2
             WHERE status = ?3 AND updated_at_ms <= ?4",
            params![
                CheckpointStatus::Pending.as_str(),
                now,
                CheckpointStatus::Resolving.as_str(),
                cutoff
            ],
        )?;
        if recovered > 0 {
            warn!(recovered, "Returned stale checkpoint claims to pending");
        }
        Ok(recovered)
    }

    /// Delete completed checkpoints last touched before `retention` ago.
    pub fn purge_completed_older_than(&self, retention: Duration) -> StoreResult<usize> {
        let cutoff = self.clock.now_ms() - retention.as_millis() as i64;
        let conn = self.db.conn()?;
        let removed = conn.execute(
            "DELETE FROM pipeline_checkpoints WHERE status = ?1 AND updated_at_ms < ?2",
            params![CheckpointStatus::Completed.as_str(), cutoff],
        )?;
        debug!(removed, "Purged completed checkpoints");
        Ok(removed)
    }

    pub fn load(&self, correlation_id: &CorrelationId) -> StoreResult<Option<CheckpointRecord>> {
        let conn = self.db.conn()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM pipeline_checkpoints WHERE correlation_id = ?1"
        );
        let found = conn
            .query_row(&sql, params![correlation_id.as_str()], row_to_record)
            .optional()?;
        found.map(finish).transpose()
    }

    /// Pending checkpoints, oldest first.
    pub fn list_pending(&self) -> StoreResult<Vec<CheckpointRecord>> {
        let conn = self.db.conn()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM pipeline_checkpoints
             WHERE status = ?1 ORDER BY created_at_ms ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![CheckpointStatus::Pending.as_str()], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(finish).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finintel_core::ManualClock;

    fn store() -> (tempfile::TempDir, Arc<ManualClock>, CheckpointStore) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_path(&dir.path().join("cp.db")).unwrap();
        let clock = Arc::new(ManualClock::new(1_000));
        let store = CheckpointStore::new(db, clock.clone());
        (dir, clock, store)
    }

    #[test]
    fn test_claim_is_exactly_once() {
        let (_dir, _clock, store) = store();
        let id = CorrelationId::from_string("req-1");
        store.save_pending(&id, "s1", "COIN", "{\"x\":1}").unwrap();

        let claimed = store.claim_pending(&id).unwrap().unwrap();
        assert_eq!(claimed.status, CheckpointStatus::Resolving);
        assert_eq!(claimed.state_json, "{\"x\":1}");
        assert!(store.claim_pending(&id).unwrap().is_none());
    }

    #[test]
    fn test_release_allows_reclaim() {
        let (_dir, _clock, store) = store();
        let id = CorrelationId::from_string("req-2");
        store.save_pending(&id, "s1", "COIN", "{}").unwrap();
        store.claim_pending(&id).unwrap().unwrap();
        assert!(store.release(&id).unwrap());
        assert!(store.claim_pending(&id).unwrap().is_some());
    }

    #[test]
    fn test_complete_persists_final_state() {
        let (_dir, _clock, store) = store();
        let id = CorrelationId::from_string("req-3");
        store.save_pending(&id, "s1", "COIN", "{}").unwrap();
        assert!(!store.complete(&id, "{\"done\":true}").unwrap());

        store.claim_pending(&id).unwrap();
        assert!(store.complete(&id, "{\"done\":true}").unwrap());
        let loaded = store.load(&id).unwrap().unwrap();
        assert_eq!(loaded.status, CheckpointStatus::Completed);
        assert_eq!(loaded.state_json, "{\"done\":true}");
        assert!(store.list_pending().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_save_rejected() {
        let (_dir, _clock, store) = store();
        let id = CorrelationId::from_string("req-4");
        store.save_pending(&id, "s1", "COIN", "{}").unwrap();
        assert!(store.save_pending(&id, "s1", "COIN", "{}").is_err());
        assert_eq!(store.list_pending().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_id() {
        let (_dir, _clock, store) = store();
        let id = CorrelationId::from_string("missing");
        assert!(store.load(&id).unwrap().is_none());
        assert!(store.claim_pending(&id).unwrap().is_none());
    }

    #[test]
    fn test_recover_stale_respects_lease() {
        let (_dir, clock, store) = store();
        let id = CorrelationId::from_string("req-5");
        store.save_pending(&id, "s1", "COIN", "{}").unwrap();
        store.claim_pending(&id).unwrap().unwrap();

        clock.advance(Duration::from_secs(10));
        assert_eq!(store.recover_stale(Duration::from_secs(300)).unwrap(), 0);
        assert!(store.list_pending().unwrap().is_empty());

        clock.advance(Duration::from_secs(300));
        assert_eq!(store.recover_stale(Duration::from_secs(300)).unwrap(), 1);
        assert_eq!(store.list_pending().unwrap().len(), 1);
        assert!(store.claim_pending(&id).unwrap().is_some());
    }

    #[test]
    fn test_recover_stale_leaves_completed_alone() {
        let (_dir, _clock, store) = store();
        let id = CorrelationId::from_string("req-6");
        store.save_pending(&id, "s1", "COIN", "{}").unwrap();
        store.claim_pending(&id).unwrap();
        store.complete(&id, "{}").unwrap();

        assert_eq!(store.recover_stale(Duration::ZERO).unwrap(), 0);
        assert_eq!(store.load(&id).unwrap().unwrap().status, CheckpointStatus::Completed);
    }

    #[test]
    fn test_purge_removes_only_old_completed() {
        let (_dir, clock, store) = store();
        let done = CorrelationId::from_string("done");
        let waiting = CorrelationId::from_string("waiting");
        store.save_pending(&done, "s1", "COIN", "{}").unwrap();
        store.save_pending(&waiting, "s1", "MSTR", "{}").unwrap();
        store.claim_pending(&done).unwrap();
        store.complete(&done, "{}").unwrap();

        let day = Duration::from_secs(86_400);
        assert_eq!(store.purge_completed_older_than(day).unwrap(), 0);

        clock.advance(day + Duration::from_secs(1));
        assert_eq!(store.purge_completed_older_than(day).unwrap(), 1);
        assert!(store.load(&done).unwrap().is_none());
        assert_eq!(store.list_pending().unwrap().len(), 1);
    }
}
