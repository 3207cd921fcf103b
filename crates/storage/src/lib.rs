// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Persistence layer for Taro: terminal-instance history and the
//! disabled-job registry, both backed by one embedded SQLite file.

mod disabled;
mod history;
mod migration;

pub use disabled::{DisabledRecord, DisabledRegistry, PatternKind};
pub use history::{HistoryQuery, HistoryRecord, HistoryStore, StateClass};
pub use migration::SCHEMA_VERSION;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// The operation needs the history database and persistence is disabled.
    #[error("persistence is required for this operation")]
    PersistenceRequired,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("schema version {found} is newer than supported ({supported})")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
