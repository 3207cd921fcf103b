// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for ps/stop/release/wait/tail control flow.

use super::prelude::*;

#[test]
fn pending_instance_released_to_completion() {
    let daemon = TestDaemon::start();
    let exec = daemon.taro_background(&["exec", "--id", "batch", "--pending", "morning", "true"]);

    wait_until("instance pending in ps", || {
        stdout_str(&daemon.taro(&["ps"])).contains("pending")
    });

    let release = daemon.taro(&["release", "morning"]);
    assert!(release.status.success());
    assert!(stdout_str(&release).contains("Released 1"));

    let output = exec.wait_with_output().expect("exec output");
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    assert!(stderr_str(&output).contains("completed"));
}

#[test]
fn release_unknown_latch_is_user_error() {
    let daemon = TestDaemon::start();
    let output = daemon.taro(&["release", "nothing"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn stop_terminates_with_exit_zero() {
    let daemon = TestDaemon::start();
    let exec = daemon.taro_background(&["exec", "--id", "sleeper", "sleep", "30"]);

    wait_until("instance running in ps", || {
        stdout_str(&daemon.taro(&["ps"])).contains("running")
    });

    let stop = daemon.taro(&["stop", "sleeper"]);
    assert!(stop.status.success());
    assert!(stdout_str(&stop).contains("Signalled 1"));

    // STOPPED carries no failure bit, so exec exits 0
    let output = exec.wait_with_output().expect("exec output");
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    assert!(stderr_str(&output).contains("stopped"));
}

#[test]
fn interrupt_terminates_with_failure() {
    let daemon = TestDaemon::start();
    let exec = daemon.taro_background(&["exec", "--id", "sleeper", "sleep", "30"]);

    wait_until("instance running in ps", || {
        stdout_str(&daemon.taro(&["ps"])).contains("running")
    });

    daemon.taro(&["interrupt", "sleeper"]);

    let output = exec.wait_with_output().expect("exec output");
    assert!(!output.status.success());
    assert!(stderr_str(&output).contains("interrupted"));
}

#[test]
fn stop_unknown_selector_is_user_error() {
    let daemon = TestDaemon::start();
    let output = daemon.taro(&["stop", "nope"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn wait_returns_when_state_entered() {
    let daemon = TestDaemon::start();
    let wait = daemon.taro_background(&["wait", "completed", "--timeout-ms", "10000"]);

    // Give the waiter time to subscribe before the quick exec
    std::thread::sleep(std::time::Duration::from_millis(300));
    daemon.taro(&["exec", "true"]);

    let output = wait.wait_with_output().expect("wait output");
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    assert!(stdout_str(&output).contains("completed"));
}

#[test]
fn wait_times_out_with_user_error() {
    let daemon = TestDaemon::start();
    let output = daemon.taro(&["wait", "stopped", "--timeout-ms", "100"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn wait_rejects_unknown_state() {
    let daemon = TestDaemon::start();
    let output = daemon.taro(&["wait", "bogus"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("unknown state"));
}

#[test]
fn tail_shows_recent_output() {
    let daemon = TestDaemon::start();
    let exec = daemon.taro_background(&[
        "exec",
        "--id",
        "drip",
        "sh",
        "-c",
        "echo early; sleep 5",
    ]);

    wait_until("output captured in tail", || {
        stdout_str(&daemon.taro(&["tail", "drip"])).contains("early")
    });

    daemon.taro(&["stop", "drip"]);
    let _ = exec.wait_with_output();
}

#[test]
fn tail_of_terminated_instance_comes_from_history() {
    let daemon = TestDaemon::start();
    let exec = daemon.taro(&["exec", "--id", "gone", "echo", "leftover"]);
    let instance_id = stderr_str(&exec)
        .lines()
        .find_map(|l| l.strip_prefix("instance: ").map(str::to_string))
        .expect("instance id in exec stderr");

    let output = daemon.taro(&["tail", &instance_id]);
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    assert!(stdout_str(&output).contains("leftover"));
}

#[test]
fn listen_streams_state_changes() {
    let daemon = TestDaemon::start();
    let mut listen = daemon.taro_background(&["listen"]);

    std::thread::sleep(std::time::Duration::from_millis(300));
    daemon.taro(&["exec", "--id", "watched", "true"]);

    // Give the stream a moment, then terminate the listener
    std::thread::sleep(std::time::Duration::from_millis(500));
    let _ = listen.kill();
    let output = listen.wait_with_output().expect("listen output");
    let stdout = stdout_str(&output);
    assert!(stdout.contains("watched"), "listen output: {stdout}");
    assert!(stdout.contains("-> running"));
}
