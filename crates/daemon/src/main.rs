// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Taro Daemon (tarod)
//!
//! Per-host job supervisor. Owns the live-instance registry and serves
//! control and event-subscription requests over a Unix socket.
//!
//! Architecture:
//! - Listener task: accepts socket connections, one task per client
//! - Supervisor: admission, child monitoring, event fan-out
//! - Signal loop: SIGTERM/SIGINT interrupt all children, then exit

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;
use std::time::Instant;

use taro_daemon::lifecycle::{self, Config, LifecycleError, StartupResult};
use taro_daemon::listener::{ListenCtx, Listener};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("tarod {}", taro_daemon::VERSION);
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("tarod {}", taro_daemon::VERSION);
                println!("Taro Daemon - per-host job supervisor");
                println!();
                println!("USAGE:");
                println!("    tarod");
                println!();
                println!("The daemon is typically started by the `taro` CLI or an init");
                println!("system. It listens on a Unix socket for commands from `taro`.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: tarod [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    // Rotate log file if it has grown too large
    rotate_log_if_needed(&config.log_path);

    // Set up logging
    let log_guard = setup_logging(&config)?;

    info!("Starting daemon");

    let StartupResult {
        lock_file: _lock_file,
        listener: unix_listener,
        supervisor,
    } = match lifecycle::startup(&config).await {
        Ok(result) => result,
        Err(LifecycleError::LockFailed(_)) => {
            // Another daemon is already running; print a human-readable
            // message instead of a raw debug error.
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("tarod is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let shutdown_notify = Arc::new(Notify::new());

    // Spawn listener task
    let ctx = Arc::new(ListenCtx {
        supervisor: Arc::clone(&supervisor),
        start_time: Instant::now(),
        shutdown: Arc::clone(&shutdown_notify),
    });
    tokio::spawn(Listener::new(unix_listener, ctx).run());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("Daemon ready, listening on {}", config.socket_path.display());

    // Signal ready for parent process (e.g. the CLI waiting for startup)
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = shutdown_notify.notified() => {
            info!("Shutdown requested via command");
        }
    }

    // Interrupt every live instance and wait for each to terminate.
    // Further SIGTERM/SIGINT during this window are swallowed by the
    // installed signal streams, so re-sending does not escalate.
    supervisor.shutdown().await;

    lifecycle::cleanup(&config);
    info!("Daemon stopped");
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (daemon.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `daemon.log` → `daemon.log.1` → `daemon.log.2` → `daemon.log.3`,
/// deleting the oldest. Best-effort: rotation failures are silently
/// ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
