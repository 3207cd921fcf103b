// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events emitted by the supervisor.
//!
//! Serializes with `{"event_type": "...", ...fields}` so remote consumers
//! can dispatch on the tag.

use crate::id::InstanceId;
use crate::instance::Snapshot;
use crate::state::ExecutionState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which child stream a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => write!(f, "stdout"),
            OutputStream::Stderr => write!(f, "stderr"),
        }
    }
}

/// One captured line of child output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
    pub at: u64,
}

/// Notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum Event {
    /// An instance entered a new state.
    ///
    /// Not emitted for the implicit NONE→CREATED birth transition.
    #[serde(rename = "state_changed")]
    StateChanged {
        instance: Snapshot,
        from: ExecutionState,
        to: ExecutionState,
        at: u64,
    },

    /// An instance produced a line of output.
    #[serde(rename = "output_line")]
    OutputLine {
        instance_id: InstanceId,
        stream: OutputStream,
        text: String,
        at: u64,
    },
}

impl Event {
    /// Instance this event belongs to.
    pub fn instance_id(&self) -> &InstanceId {
        match self {
            Event::StateChanged { instance, .. } => &instance.id,
            Event::OutputLine { instance_id, .. } => instance_id,
        }
    }

    pub fn is_state_changed(&self) -> bool {
        matches!(self, Event::StateChanged { .. })
    }

    pub fn is_output(&self) -> bool {
        matches!(self, Event::OutputLine { .. })
    }
}

/// Selects which events a subscription receives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Receive state-change events.
    #[serde(default)]
    pub states: bool,
    /// Receive output-line events.
    #[serde(default)]
    pub output: bool,
    /// Restrict to a single instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<InstanceId>,
}

impl EventFilter {
    /// All state and output events.
    pub fn all() -> Self {
        Self {
            states: true,
            output: true,
            instance: None,
        }
    }

    /// State-change events only.
    pub fn states_only() -> Self {
        Self {
            states: true,
            output: false,
            instance: None,
        }
    }

    /// Output events only.
    pub fn output_only() -> Self {
        Self {
            states: false,
            output: true,
            instance: None,
        }
    }

    /// Restrict this filter to one instance.
    pub fn for_instance(mut self, id: InstanceId) -> Self {
        self.instance = Some(id);
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        let kind_ok = match event {
            Event::StateChanged { .. } => self.states,
            Event::OutputLine { .. } => self.output,
        };
        if !kind_ok {
            return false;
        }
        match &self.instance {
            Some(id) => event.instance_id() == id,
            None => true,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
