// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `taro exec` end-to-end behavior.

use super::prelude::*;

#[test]
fn exec_echo_completes_with_output_and_exit_zero() {
    let daemon = TestDaemon::start();
    let output = daemon.taro(&["exec", "echo", "hi"]);

    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    assert_eq!(stdout_str(&output).trim(), "hi");
    assert!(stderr_str(&output).contains("completed"));
}

#[test]
fn exec_false_fails_with_exit_code_error() {
    let daemon = TestDaemon::start();
    let output = daemon.taro(&["exec", "false"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("exit code 1"));
}

#[test]
fn exec_unknown_binary_reports_spawn_failure() {
    let daemon = TestDaemon::start();
    let output = daemon.taro(&["exec", "no-such-binary-here"]);

    assert!(!output.status.success());
    assert!(stderr_str(&output).contains("failed to spawn"));
}

#[test]
fn exec_bypass_output_captures_nothing() {
    let daemon = TestDaemon::start();
    let output = daemon.taro(&["exec", "-b", "echo", "loud"]);

    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    assert_eq!(stdout_str(&output).trim(), "");
}

#[test]
fn exec_records_history() {
    let daemon = TestDaemon::start();
    daemon.taro(&["exec", "--id", "greeter", "echo", "hi"]);

    let output = daemon.taro(&["history", "--job", "greeter"]);
    assert!(output.status.success());
    let stdout = stdout_str(&output);
    assert!(stdout.contains("greeter"));
    assert!(stdout.contains("completed"));

    // The alias works too
    let output = daemon.taro(&["hist", "--job", "greeter"]);
    assert!(stdout_str(&output).contains("greeter"));
}

#[test]
fn exec_without_daemon_autostarts_it() {
    let state_dir = tempfile::tempdir().unwrap();
    let output = std::process::Command::new(binary_path("taro"))
        .args(["exec", "echo", "auto"])
        .env("TARO_STATE_DIR", state_dir.path())
        .env("TARO_DAEMON_BINARY", binary_path("tarod"))
        .output()
        .expect("run taro");

    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    assert_eq!(stdout_str(&output).trim(), "auto");

    // Shut the auto-started daemon down again
    if let Ok(pid) = std::fs::read_to_string(state_dir.path().join("daemon.pid")) {
        let _ = std::process::Command::new("kill")
            .args(["-TERM", pid.trim()])
            .status();
    }
}

#[test]
fn queries_without_daemon_exit_2() {
    let state_dir = tempfile::tempdir().unwrap();
    let output = std::process::Command::new(binary_path("taro"))
        .args(["ps"])
        .env("TARO_STATE_DIR", state_dir.path())
        .output()
        .expect("run taro");

    assert_eq!(output.status.code(), Some(2));
}
