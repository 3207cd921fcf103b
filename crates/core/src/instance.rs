// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job instance model and lifecycle state machine.

use crate::id::{InstanceId, JobId};
use crate::state::ExecutionState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// State machine violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        from: ExecutionState,
        to: ExecutionState,
    },
}

/// What a new execution should look like.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecSpec {
    pub job_id: JobId,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Hold the instance PENDING until this latch is released.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_latch: Option<String>,
    /// Skip output capture entirely (no tail, no output events).
    #[serde(default)]
    pub bypass_output: bool,
}

impl ExecSpec {
    pub fn new(job_id: impl Into<JobId>, command: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            command: command.into(),
            args: Vec::new(),
            pending_latch: None,
            bypass_output: false,
        }
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn pending_latch(mut self, latch: impl Into<String>) -> Self {
        self.pending_latch = Some(latch.into());
        self
    }

    pub fn bypass_output(mut self, bypass: bool) -> Self {
        self.bypass_output = bypass;
        self
    }

    /// The full command line, used for display and as the default job ID.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

/// Ordered record of states an instance has entered, with entry timestamps.
///
/// At most one entry per state; states never repeat or regress.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lifecycle {
    entries: Vec<(ExecutionState, u64)>,
}

impl Lifecycle {
    /// Current state; [`ExecutionState::None`] before any entry.
    pub fn state(&self) -> ExecutionState {
        self.entries
            .last()
            .map(|(s, _)| *s)
            .unwrap_or(ExecutionState::None)
    }

    /// Entry timestamp for a visited state.
    pub fn entered_at(&self, state: ExecutionState) -> Option<u64> {
        self.entries
            .iter()
            .find(|(s, _)| *s == state)
            .map(|(_, at)| *at)
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[(ExecutionState, u64)] {
        &self.entries
    }

    fn push(&mut self, state: ExecutionState, at: u64) {
        self.entries.push((state, at));
    }
}

/// Which terminal state a stop/interrupt request selects on child exit.
///
/// The first request wins; later requests are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationIntent {
    Stop,
    Interrupt,
}

impl TerminationIntent {
    /// Terminal state this intent selects.
    pub fn terminal_state(self) -> ExecutionState {
        match self {
            TerminationIntent::Stop => ExecutionState::Stopped,
            TerminationIntent::Interrupt => ExecutionState::Interrupted,
        }
    }
}

/// One execution of a job.
#[derive(Debug, Clone)]
pub struct JobInstance {
    pub id: InstanceId,
    pub job_id: JobId,
    pub command: String,
    pub args: Vec<String>,
    pub pending_latch: Option<String>,
    pub lifecycle: Lifecycle,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

impl JobInstance {
    /// Create an instance in CREATED.
    pub fn create(id: InstanceId, spec: &ExecSpec, at: u64) -> Self {
        let mut lifecycle = Lifecycle::default();
        lifecycle.push(ExecutionState::Created, at);
        Self {
            id,
            job_id: spec.job_id.clone(),
            command: spec.command.clone(),
            args: spec.args.clone(),
            pending_latch: spec.pending_latch.clone(),
            lifecycle,
            exit_code: None,
            error: None,
        }
    }

    pub fn state(&self) -> ExecutionState {
        self.lifecycle.state()
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Advance to `to` at time `at`.
    ///
    /// Idempotent when `to` is the current state (`Ok(None)`); otherwise
    /// either records the transition (`Ok(Some(from))`) or rejects it.
    pub fn transition(
        &mut self,
        to: ExecutionState,
        at: u64,
    ) -> Result<Option<ExecutionState>, StateError> {
        let from = self.state();
        if from == to {
            return Ok(None);
        }
        if !from.can_transition(to) {
            return Err(StateError::IllegalTransition { from, to });
        }
        self.lifecycle.push(to, at);
        Ok(Some(from))
    }

    /// Point-in-time copy for events, queries, and history.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            id: self.id.clone(),
            job_id: self.job_id.clone(),
            command_line: if self.args.is_empty() {
                self.command.clone()
            } else {
                format!("{} {}", self.command, self.args.join(" "))
            },
            pending_latch: self.pending_latch.clone(),
            state: self.state(),
            lifecycle: self.lifecycle.clone(),
            exit_code: self.exit_code,
            error: self.error.clone(),
        }
    }
}

/// Immutable view of an instance at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub id: InstanceId,
    pub job_id: JobId,
    pub command_line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_latch: Option<String>,
    pub state: ExecutionState,
    pub lifecycle: Lifecycle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Snapshot {
    pub fn created_at(&self) -> Option<u64> {
        self.lifecycle.entered_at(ExecutionState::Created)
    }

    /// Entry timestamp of the terminal state, if reached.
    pub fn terminated_at(&self) -> Option<u64> {
        let state = self.state;
        if state.is_terminal() {
            self.lifecycle.entered_at(state)
        } else {
            None
        }
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
