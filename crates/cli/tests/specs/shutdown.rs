// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for supervisor signal handling.

use super::prelude::*;
use std::time::Duration;

#[test]
fn sigterm_interrupts_children_then_exits() {
    let mut daemon = TestDaemon::start();
    let exec = daemon.taro_background(&["exec", "--id", "long", "sleep", "30"]);

    wait_until("instance running in ps", || {
        stdout_str(&daemon.taro(&["ps"])).contains("running")
    });

    daemon.terminate();

    // The child is interrupted (failure bit set on the exec exit code)
    let output = exec.wait_with_output().expect("exec output");
    assert!(!output.status.success());
    assert!(stderr_str(&output).contains("interrupted"));

    // The supervisor exits only after the instance was reaped
    assert!(daemon.wait_for_exit(Duration::from_secs(10)));
}

#[test]
fn sigterm_with_idle_supervisor_exits_promptly() {
    let mut daemon = TestDaemon::start();
    daemon.terminate();
    assert!(daemon.wait_for_exit(Duration::from_secs(10)));
    assert!(!daemon.socket_path().exists());
}
