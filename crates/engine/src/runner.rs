// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process spawning, signalling, and terminal-state selection.
//!
//! Children are spawned in their own process group so a stop/interrupt
//! reaches the whole tree. Both requests deliver SIGTERM; they differ
//! only in the recorded termination intent, which selects the terminal
//! state once the child exits. A child that ignores the signal is waited
//! on indefinitely; the engine never escalates to SIGKILL.

use crate::EngineError;
use async_trait::async_trait;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use taro_core::{ExecutionState, TerminationIntent};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

/// A spawned child with its capture pipes split out.
#[derive(Debug)]
pub struct SpawnedChild {
    pub pid: u32,
    pub child: Child,
    pub stdout: Option<ChildStdout>,
    pub stderr: Option<ChildStderr>,
}

/// Seam for spawning OS processes.
#[async_trait]
pub trait ProcessLauncher: Send + Sync + 'static {
    /// Spawn `command` with `args` in a new process group.
    ///
    /// With `capture` set, stdout/stderr are piped; otherwise both are
    /// discarded.
    async fn spawn(&self, command: &str, args: &[String], capture: bool)
        -> Result<SpawnedChild, EngineError>;
}

/// Launcher backed by `tokio::process`.
#[derive(Clone, Default)]
pub struct SystemLauncher;

#[async_trait]
impl ProcessLauncher for SystemLauncher {
    async fn spawn(
        &self,
        command: &str,
        args: &[String],
        capture: bool,
    ) -> Result<SpawnedChild, EngineError> {
        let mut cmd = Command::new(command);
        cmd.args(args).stdin(Stdio::null()).process_group(0);
        if capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let spawn_failure = |reason: String| EngineError::SpawnFailure {
            command: command.to_string(),
            reason,
        };

        let mut child = cmd.spawn().map_err(|e| spawn_failure(e.to_string()))?;
        let pid = child
            .id()
            .ok_or_else(|| spawn_failure("child exited before it was tracked".to_string()))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        Ok(SpawnedChild {
            pid,
            child,
            stdout,
            stderr,
        })
    }
}

/// Per-instance signalling handle, alive while the child runs.
pub struct ProcessRunner {
    pgid: Pid,
    intent: Mutex<Option<TerminationIntent>>,
}

impl ProcessRunner {
    /// Track the child whose process group is its own pid.
    pub fn new(pid: u32) -> Self {
        Self {
            pgid: Pid::from_raw(pid as i32),
            intent: Mutex::new(None),
        }
    }

    /// Record the termination intent (first request wins) and signal the
    /// process group. Returns the winning intent.
    pub fn request(&self, intent: TerminationIntent) -> TerminationIntent {
        let winner = {
            let mut guard = self.intent.lock();
            *guard.get_or_insert(intent)
        };
        // Re-sending SIGTERM to an already-signalled group is harmless
        if let Err(e) = killpg(self.pgid, Signal::SIGTERM) {
            tracing::debug!(pgid = %self.pgid, error = %e, "killpg failed");
        }
        winner
    }

    /// Intent recorded so far, if any.
    pub fn intent(&self) -> Option<TerminationIntent> {
        *self.intent.lock()
    }
}

/// Choose the terminal state for an exited child.
///
/// Returns `(state, exit_code, error)`.
pub fn select_terminal_state(
    status: ExitStatus,
    intent: Option<TerminationIntent>,
) -> (ExecutionState, Option<i32>, Option<String>) {
    if let Some(intent) = intent {
        return (intent.terminal_state(), status.code(), None);
    }

    match status.code() {
        Some(0) => (ExecutionState::Completed, Some(0), None),
        Some(code) => (
            ExecutionState::Failed,
            Some(code),
            Some(format!("exit code {code}")),
        ),
        None => match status.signal() {
            // Signals inherited from outside are unplanned; record them
            // as interruptions
            Some(sig) if sig == Signal::SIGTERM as i32 || sig == Signal::SIGINT as i32 => {
                (ExecutionState::Interrupted, None, None)
            }
            Some(sig) => (
                ExecutionState::Failed,
                None,
                Some(format!("terminated by signal {sig}")),
            ),
            None => (
                ExecutionState::Failed,
                None,
                Some("exited with unknown status".to_string()),
            ),
        },
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
