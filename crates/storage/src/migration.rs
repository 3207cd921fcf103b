// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forward-only schema migration.
//!
//! Each step upgrades the schema by exactly one version inside a
//! transaction; `schema_version` holds a single row with the current
//! version. Opening a database newer than [`SCHEMA_VERSION`] fails.

use crate::StorageError;
use rusqlite::{Connection, Transaction};

/// Schema version this binary reads and writes.
pub const SCHEMA_VERSION: u32 = 1;

type Step = fn(&Transaction) -> rusqlite::Result<()>;

/// Migration steps; index `n` upgrades version `n` to `n + 1`.
const STEPS: [Step; 1] = [migrate_v0_to_v1];

/// Bring the database up to [`SCHEMA_VERSION`].
pub fn migrate(conn: &mut Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    let mut version = current_version(conn)?;
    if version > SCHEMA_VERSION {
        return Err(StorageError::SchemaTooNew {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    while version < SCHEMA_VERSION {
        let tx = conn.transaction()?;
        STEPS[version as usize](&tx)?;
        tx.execute("DELETE FROM schema_version", [])?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version + 1],
        )?;
        tx.commit()?;
        version += 1;
        tracing::debug!(version, "schema migrated");
    }

    Ok(())
}

fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    let version = conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .unwrap_or(0u32);
    Ok(version)
}

fn migrate_v0_to_v1(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute(
        "CREATE TABLE history (
            instance_id   TEXT PRIMARY KEY,
            job_id        TEXT NOT NULL,
            command       TEXT NOT NULL,
            created_at    INTEGER NOT NULL,
            terminated_at INTEGER NOT NULL,
            state         TEXT NOT NULL,
            exit_code     INTEGER,
            error         TEXT,
            tail          TEXT NOT NULL
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_history_job_id ON history (job_id)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_history_terminated_at ON history (terminated_at)",
        [],
    )?;
    tx.execute(
        "CREATE TABLE disabled (
            pattern     TEXT PRIMARY KEY,
            kind        TEXT NOT NULL,
            disabled_at INTEGER NOT NULL,
            disabled_by TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
