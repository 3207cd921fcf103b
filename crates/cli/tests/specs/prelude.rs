// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers for behavioral specifications.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

/// How long to wait for the daemon socket to appear.
pub const DAEMON_START_TIMEOUT: Duration = Duration::from_secs(10);
/// Generic polling deadline for spec assertions.
pub const SPEC_WAIT: Duration = Duration::from_secs(10);
pub const SPEC_POLL: Duration = Duration::from_millis(25);

/// Returns the path to a built binary.
///
/// Resolves relative to the test binary itself (target/debug/deps/..),
/// falling back to CARGO_MANIFEST_DIR for unusual layouts.
pub fn binary_path(name: &str) -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let candidate = debug_dir.join(name);
            if candidate.exists() {
                return candidate;
            }
        }
    }

    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../target/debug")
        .join(name)
}

/// A daemon instance bound to a temporary state directory.
pub struct TestDaemon {
    pub state_dir: tempfile::TempDir,
    child: Child,
}

impl TestDaemon {
    /// Start `tarod` and wait for its socket to accept connections.
    pub fn start() -> Self {
        let state_dir = tempfile::tempdir().expect("create state dir");
        let child = Command::new(binary_path("tarod"))
            .env("TARO_STATE_DIR", state_dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn tarod");

        let daemon = Self { state_dir, child };
        daemon.wait_for_socket();
        daemon
    }

    pub fn socket_path(&self) -> PathBuf {
        self.state_dir.path().join("daemon.sock")
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    fn wait_for_socket(&self) {
        let start = Instant::now();
        while start.elapsed() < DAEMON_START_TIMEOUT {
            if std::os::unix::net::UnixStream::connect(self.socket_path()).is_ok() {
                return;
            }
            std::thread::sleep(SPEC_POLL);
        }
        panic!("tarod did not start within {DAEMON_START_TIMEOUT:?}");
    }

    /// Run a `taro` command against this daemon and wait for it.
    pub fn taro(&self, args: &[&str]) -> Output {
        Command::new(binary_path("taro"))
            .args(args)
            .env("TARO_STATE_DIR", self.state_dir.path())
            .output()
            .expect("run taro")
    }

    /// Spawn a `taro` command without waiting (for pending/long-running flows).
    pub fn taro_background(&self, args: &[&str]) -> Child {
        Command::new(binary_path("taro"))
            .args(args)
            .env("TARO_STATE_DIR", self.state_dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn taro")
    }

    /// Send SIGTERM to the daemon process.
    pub fn terminate(&self) {
        let _ = Command::new("kill")
            .args(["-TERM", &self.child.id().to_string()])
            .status();
    }

    /// Wait for the daemon process to exit.
    pub fn wait_for_exit(&mut self, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Ok(Some(_)) = self.child.try_wait() {
                return true;
            }
            std::thread::sleep(SPEC_POLL);
        }
        false
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Poll until `check` passes or the deadline elapses.
pub fn wait_until(description: &str, mut check: impl FnMut() -> bool) {
    let start = Instant::now();
    while start.elapsed() < SPEC_WAIT {
        if check() {
            return;
        }
        std::thread::sleep(SPEC_POLL);
    }
    panic!("timed out waiting for: {description}");
}

pub fn stdout_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
