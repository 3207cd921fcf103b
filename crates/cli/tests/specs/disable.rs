// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for the disabled-job admission filter.

use super::prelude::*;

#[test]
fn disabled_job_is_admitted_but_never_runs() {
    let daemon = TestDaemon::start();

    let disable = daemon.taro(&["disable", "jobA"]);
    assert!(disable.status.success(), "stderr: {}", stderr_str(&disable));

    let output = daemon.taro(&["exec", "--id", "jobA", "echo", "never"]);
    // DISABLED carries no failure bit
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    assert!(stderr_str(&output).contains("disabled"));
    assert_eq!(stdout_str(&output).trim(), "");

    let history = daemon.taro(&["history", "--job", "jobA"]);
    assert!(stdout_str(&history).contains("disabled"));
}

#[test]
fn regex_patterns_match_whole_job_ids() {
    let daemon = TestDaemon::start();
    daemon.taro(&["disable", "--regex", "night.*"]);

    let output = daemon.taro(&["exec", "--id", "nightly-build", "true"]);
    assert!(stderr_str(&output).contains("disabled"));

    // Full-match semantics: a substring hit is not enough
    let output = daemon.taro(&["exec", "--id", "overnight", "true"]);
    assert!(stderr_str(&output).contains("completed"));
}

#[test]
fn enable_restores_admission() {
    let daemon = TestDaemon::start();
    daemon.taro(&["disable", "jobB"]);

    let enable = daemon.taro(&["enable", "jobB"]);
    assert!(enable.status.success());
    assert!(stdout_str(&enable).contains("Enabled 1"));

    let output = daemon.taro(&["exec", "--id", "jobB", "true"]);
    assert!(stderr_str(&output).contains("completed"));
}

#[test]
fn list_disabled_shows_patterns() {
    let daemon = TestDaemon::start();
    daemon.taro(&["disable", "alpha"]);
    daemon.taro(&["disable", "--regex", "beta-.*"]);

    let output = daemon.taro(&["list-disabled"]);
    let stdout = stdout_str(&output);
    assert!(stdout.contains("alpha"));
    assert!(stdout.contains("exact"));
    assert!(stdout.contains("beta-.*"));
    assert!(stdout.contains("regex"));
}

#[test]
fn persistence_disabled_exits_3() {
    // A daemon with persistence off cannot serve disable/history
    let state_dir = tempfile::tempdir().unwrap();
    let mut child = std::process::Command::new(binary_path("tarod"))
        .env("TARO_STATE_DIR", state_dir.path())
        .env("TARO_NO_PERSISTENCE", "1")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .expect("spawn tarod");

    let socket = state_dir.path().join("daemon.sock");
    let start = std::time::Instant::now();
    while start.elapsed() < DAEMON_START_TIMEOUT {
        if std::os::unix::net::UnixStream::connect(&socket).is_ok() {
            break;
        }
        std::thread::sleep(SPEC_POLL);
    }

    let run = |args: &[&str]| {
        std::process::Command::new(binary_path("taro"))
            .args(args)
            .env("TARO_STATE_DIR", state_dir.path())
            .output()
            .expect("run taro")
    };

    assert_eq!(run(&["disable", "jobA"]).status.code(), Some(3));
    assert_eq!(run(&["enable", "jobA"]).status.code(), Some(3));
    assert_eq!(run(&["list-disabled"]).status.code(), Some(3));
    assert_eq!(run(&["history"]).status.code(), Some(3));

    // Plain execution still works
    let output = run(&["exec", "echo", "hi"]);
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));

    let _ = child.kill();
    let _ = child.wait();
}
