// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use crate::lifecycle::LifecycleError;
use std::path::PathBuf;

/// Resolve state directory: TARO_STATE_DIR > XDG_STATE_HOME/taro > ~/.local/state/taro
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("TARO_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("taro"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/taro"))
}

/// Whether the history database is in use (`TARO_NO_PERSISTENCE=1` disables it).
pub fn persistence_enabled() -> bool {
    !matches!(
        std::env::var("TARO_NO_PERSISTENCE").ok().as_deref(),
        Some("1") | Some("true")
    )
}

/// Tail ring capacity override.
pub fn tail_capacity() -> Option<usize> {
    std::env::var("TARO_TAIL_CAPACITY")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
}
