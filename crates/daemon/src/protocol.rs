// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for supervisor control.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.
//! Requests get exactly one response; `Exec`, `Subscribe`, and a
//! following `GetTail` are then followed by a stream of [`Event`] frames
//! on the same connection.

pub mod wire;

use serde::{Deserialize, Serialize};
use taro_core::{EventFilter, ExecSpec, ExecutionState, InstanceId, JobId, OutputLine, Snapshot};
use taro_engine::EngineError;
use taro_storage::{DisabledRecord, HistoryQuery, HistoryRecord};

/// Request from CLI to daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Admit and run a job instance.
    ///
    /// Response `Started` is followed by this instance's event stream,
    /// ending after the terminal state event.
    Exec { spec: ExecSpec },

    /// List live instances
    Ps,

    /// Request graceful stop (instance ID or job ID)
    Stop { selector: String },

    /// Request interrupt (instance ID or job ID)
    Interrupt { selector: String },

    /// Release all instances pending on a latch
    Release { latch: String },

    /// Stream events matching a filter until the client disconnects
    Subscribe { filter: EventFilter },

    /// Block until any instance enters `state`, or the deadline elapses
    Wait {
        state: ExecutionState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Tail windows of live instances.
    ///
    /// With `follow` set (single-instance selector required), the
    /// response is followed by output events until the instance
    /// terminates.
    GetTail {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        #[serde(default)]
        follow: bool,
    },

    /// Query terminated-instance history
    History { query: HistoryQuery },

    /// Add disabled-job patterns
    Disable {
        patterns: Vec<String>,
        #[serde(default)]
        regex: bool,
        by: String,
    },

    /// Remove disabled-job patterns
    Enable { patterns: Vec<String> },

    /// List disabled-job patterns
    ListDisabled,

    /// Get daemon status
    Status,

    /// Request daemon shutdown
    Shutdown,
}

/// One instance's tail window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TailView {
    pub instance_id: InstanceId,
    pub job_id: JobId,
    pub state: ExecutionState,
    pub lines: Vec<OutputLine>,
}

impl TailView {
    pub fn from_snapshot(snapshot: &Snapshot, lines: Vec<OutputLine>) -> Self {
        Self {
            instance_id: snapshot.id.clone(),
            job_id: snapshot.job_id.clone(),
            state: snapshot.state,
            lines,
        }
    }

    pub fn from_history(record: &HistoryRecord) -> Self {
        Self {
            instance_id: record.instance_id.clone(),
            job_id: record.job_id.clone(),
            state: record.state,
            lines: record.tail.clone(),
        }
    }
}

/// Response from daemon to CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Version handshake response
    Hello { version: String },

    /// Instance admitted; its event stream follows
    Started { instance_id: InstanceId },

    /// Live instance snapshots
    Instances { instances: Vec<Snapshot> },

    /// Stop/interrupt delivered to this many instances
    Signalled { count: usize },

    /// Latch released
    Released { count: usize },

    /// Subscription established; event frames follow
    Subscribed,

    /// An awaited event arrived
    Waited { instance: Snapshot },

    /// Tail windows
    Tails { tails: Vec<TailView> },

    /// History query result
    HistoryRecords { records: Vec<HistoryRecord> },

    /// Patterns newly disabled
    Disabled { records: Vec<DisabledRecord> },

    /// Patterns removed from the disabled set
    Enabled { count: usize },

    /// All disabled patterns
    DisabledList { records: Vec<DisabledRecord> },

    /// Daemon status
    Status { uptime_secs: u64, live: usize },

    /// Daemon is shutting down
    ShuttingDown,

    /// Error response
    Error { kind: String, message: String },
}

impl Response {
    /// Error response for an engine failure.
    pub fn from_engine_error(e: &EngineError) -> Self {
        Response::Error {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }

    /// Error response for a malformed or unsupported request.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Response::Error {
            kind: "invalid_request".to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
