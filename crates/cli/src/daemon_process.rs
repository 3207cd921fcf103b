// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management utilities.
//!
//! Functions for locating and starting the tarod process.

use crate::client::ClientError;
use std::path::PathBuf;

/// Start the daemon in the background, returning the child process handle
pub fn start_daemon_background() -> Result<std::process::Child, ClientError> {
    let tarod_path = find_tarod_binary();

    std::process::Command::new(&tarod_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(format!("{}: {e}", tarod_path.display())))
}

/// Find the tarod binary: `TARO_DAEMON_BINARY`, then a sibling of the
/// CLI binary, then `PATH`.
fn find_tarod_binary() -> PathBuf {
    if let Ok(path) = std::env::var("TARO_DAEMON_BINARY") {
        return PathBuf::from(path);
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("tarod");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("tarod")
}

/// Socket path for the user-level daemon.
pub fn daemon_socket() -> Result<PathBuf, ClientError> {
    let dir = state_dir()?;
    Ok(dir.join("daemon.sock"))
}

/// State directory, mirroring the daemon's resolution order.
pub fn state_dir() -> Result<PathBuf, ClientError> {
    if let Ok(dir) = std::env::var("TARO_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("taro"));
    }
    let home = std::env::var("HOME").map_err(|_| ClientError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/taro"))
}
