// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution states and the transition graph.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a job instance's execution.
///
/// States form a forward-only graph; see [`ExecutionState::can_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// Origin state, never observed on a live instance
    None,
    /// Admitted but not yet running
    Created,
    /// Waiting on a latch release
    Pending,
    /// Rejected by the disabled-job filter
    Disabled,
    /// Child process is executing
    Running,
    /// Child exited zero with no termination request
    Completed,
    /// Graceful stop was requested and the child exited
    Stopped,
    /// Interrupt was requested or inherited from the supervisor
    Interrupted,
    /// Spawn failed or the child exited non-zero
    Failed,
}

impl ExecutionState {
    /// Whether this state has no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionState::Disabled
                | ExecutionState::Completed
                | ExecutionState::Stopped
                | ExecutionState::Interrupted
                | ExecutionState::Failed
        )
    }

    /// Whether this terminal state counts as a failed execution.
    pub fn is_failure(self) -> bool {
        matches!(self, ExecutionState::Interrupted | ExecutionState::Failed)
    }

    /// Whether `self → to` is an edge of the transition graph.
    pub fn can_transition(self, to: ExecutionState) -> bool {
        use ExecutionState::*;
        match self {
            None => matches!(to, Created),
            Created => matches!(to, Pending | Disabled | Running),
            Pending => matches!(to, Running | Stopped | Interrupted),
            Running => matches!(to, Completed | Stopped | Interrupted | Failed),
            Disabled | Completed | Stopped | Interrupted | Failed => false,
        }
    }

    /// Parse a state name as serialized on the wire (snake_case).
    pub fn parse(s: &str) -> Option<Self> {
        use ExecutionState::*;
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(None),
            "created" => Some(Created),
            "pending" => Some(Pending),
            "disabled" => Some(Disabled),
            "running" => Some(Running),
            "completed" => Some(Completed),
            "stopped" => Some(Stopped),
            "interrupted" => Some(Interrupted),
            "failed" => Some(Failed),
            _ => Option::None,
        }
    }

    /// Stable lowercase name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        use ExecutionState::*;
        match self {
            None => "none",
            Created => "created",
            Pending => "pending",
            Disabled => "disabled",
            Running => "running",
            Completed => "completed",
            Stopped => "stopped",
            Interrupted => "interrupted",
            Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
