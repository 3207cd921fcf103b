// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds surfaced by the engine.

use taro_core::StateError;
use taro_storage::StorageError;
use thiserror::Error;

/// Errors that can occur in the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn '{command}': {reason}")]
    SpawnFailure { command: String, reason: String },

    #[error(transparent)]
    IllegalTransition(#[from] StateError),

    #[error("unknown instance or job: {0}")]
    UnknownInstance(String),

    #[error("unknown latch: {0}")]
    UnknownLatch(String),

    #[error("persistence is required for this operation")]
    PersistenceRequired,

    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("timed out")]
    Timeout,
}

impl EngineError {
    /// Stable kind tag for the wire protocol and exit-code mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::SpawnFailure { .. } => "spawn_failure",
            EngineError::IllegalTransition(_) => "illegal_transition",
            EngineError::UnknownInstance(_) => "unknown_instance",
            EngineError::UnknownLatch(_) => "unknown_latch",
            EngineError::PersistenceRequired => "persistence_required",
            EngineError::PersistenceFailure(_) => "persistence_failure",
            EngineError::Timeout => "timeout",
        }
    }
}

impl From<StorageError> for EngineError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::PersistenceRequired => EngineError::PersistenceRequired,
            other => EngineError::PersistenceFailure(other.to_string()),
        }
    }
}
