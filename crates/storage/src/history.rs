// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only store of terminated job instances.

use crate::{migration, StorageError};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use taro_core::{ExecutionState, InstanceId, JobId, OutputLine, Snapshot};

/// Persisted final snapshot of a job instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub instance_id: InstanceId,
    pub job_id: JobId,
    pub command: String,
    pub created_at: u64,
    pub terminated_at: u64,
    pub state: ExecutionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tail: Vec<OutputLine>,
}

impl HistoryRecord {
    /// Build a record from a terminal snapshot. `None` for live instances.
    pub fn from_snapshot(snapshot: &Snapshot, tail: Vec<OutputLine>) -> Option<Self> {
        let terminated_at = snapshot.terminated_at()?;
        Some(Self {
            instance_id: snapshot.id.clone(),
            job_id: snapshot.job_id.clone(),
            command: snapshot.command_line.clone(),
            created_at: snapshot.created_at().unwrap_or(terminated_at),
            terminated_at,
            state: snapshot.state,
            exit_code: snapshot.exit_code,
            error: snapshot.error.clone(),
            tail,
        })
    }
}

/// Which terminal states a history query selects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    #[default]
    Any,
    /// Terminals without the failure bit (COMPLETED, STOPPED, DISABLED).
    Success,
    /// Terminals with the failure bit (INTERRUPTED, FAILED).
    Failure,
}

impl StateClass {
    fn matches(self, state: ExecutionState) -> bool {
        match self {
            StateClass::Any => true,
            StateClass::Success => !state.is_failure(),
            StateClass::Failure => state.is_failure(),
        }
    }
}

/// Filters for [`HistoryStore::query`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// Include records created at or after this epoch-ms timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,
    /// Include records created strictly before this epoch-ms timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<u64>,
    #[serde(default)]
    pub class: StateClass,
}

/// SQLite-backed history and disabled-pattern tables.
///
/// A single connection serializes all access; writes happen on terminal
/// transitions only, so contention is low.
pub struct HistoryStore {
    conn: Mutex<Connection>,
}

impl HistoryStore {
    /// Open (creating and migrating as needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Append a terminal record. At most one record per instance ID.
    pub fn record(&self, record: &HistoryRecord) -> Result<(), StorageError> {
        let tail = serde_json::to_string(&record.tail).unwrap_or_else(|_| "[]".to_string());
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO history
                (instance_id, job_id, command, created_at, terminated_at,
                 state, exit_code, error, tail)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.instance_id.as_str(),
                record.job_id.as_str(),
                record.command,
                record.created_at,
                record.terminated_at,
                record.state.as_str(),
                record.exit_code,
                record.error,
                tail,
            ],
        )?;
        Ok(())
    }

    /// Look up one record by instance ID.
    pub fn get(&self, id: &InstanceId) -> Result<Option<HistoryRecord>, StorageError> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                "SELECT instance_id, job_id, command, created_at, terminated_at,
                        state, exit_code, error, tail
                 FROM history WHERE instance_id = ?1",
                [id.as_str()],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Query records, ordered by terminal timestamp (oldest first).
    pub fn query(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT instance_id, job_id, command, created_at, terminated_at,
                    state, exit_code, error, tail
             FROM history
             WHERE (?1 IS NULL OR job_id = ?1)
               AND (?2 IS NULL OR created_at >= ?2)
               AND (?3 IS NULL OR created_at < ?3)
             ORDER BY terminated_at ASC, instance_id ASC",
        )?;
        let rows = stmt.query_map(
            params![
                query.job_id.as_ref().map(|j| j.as_str()),
                query.since,
                query.until
            ],
            row_to_record,
        )?;

        let mut records = Vec::new();
        for row in rows {
            let record = row?;
            if query.class.matches(record.state) {
                records.push(record);
            }
        }
        Ok(records)
    }

    // -- disabled table (used by DisabledRegistry) --

    /// Insert a disabled pattern. Returns false if the pattern already exists.
    pub(crate) fn insert_disabled(
        &self,
        record: &crate::DisabledRecord,
    ) -> Result<bool, StorageError> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO disabled (pattern, kind, disabled_at, disabled_by)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.pattern,
                record.kind.as_str(),
                record.disabled_at,
                record.disabled_by,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Remove a disabled pattern. Returns false if it was not present.
    pub(crate) fn delete_disabled(&self, pattern: &str) -> Result<bool, StorageError> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM disabled WHERE pattern = ?1", [pattern])?;
        Ok(deleted > 0)
    }

    /// All disabled patterns, oldest first.
    pub(crate) fn list_disabled(&self) -> Result<Vec<crate::DisabledRecord>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT pattern, kind, disabled_at, disabled_by
             FROM disabled ORDER BY disabled_at ASC, pattern ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let kind: String = row.get(1)?;
            Ok(crate::DisabledRecord {
                pattern: row.get(0)?,
                kind: crate::PatternKind::parse(&kind).unwrap_or(crate::PatternKind::Exact),
                disabled_at: row.get(2)?,
                disabled_by: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<HistoryRecord> {
    let state: String = row.get(5)?;
    let tail: String = row.get(8)?;
    Ok(HistoryRecord {
        instance_id: InstanceId::new(row.get::<_, String>(0)?),
        job_id: JobId::new(row.get::<_, String>(1)?),
        command: row.get(2)?,
        created_at: row.get(3)?,
        terminated_at: row.get(4)?,
        state: ExecutionState::parse(&state).unwrap_or(ExecutionState::Failed),
        exit_code: row.get(6)?,
        error: row.get(7)?,
        tail: serde_json::from_str(&tail).unwrap_or_default(),
    })
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
