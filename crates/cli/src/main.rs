// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! taro - per-host job supervision CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod daemon_process;
mod exit_error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{disable, exec, history, listen, ps, release, stop, tail, wait};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

#[derive(Parser)]
#[command(
    name = "taro",
    version = VERSION,
    about = "Taro - per-host job supervision and monitoring"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Admit and run a job instance, following it to termination
    Exec(exec::ExecArgs),
    /// List live instances
    Ps,
    /// Request graceful stop of an instance or job
    Stop {
        /// Instance ID or job ID
        selector: String,
    },
    /// Request interrupt of an instance or job
    Interrupt {
        /// Instance ID or job ID
        selector: String,
    },
    /// Release all instances pending on a latch
    Release {
        /// Latch name
        latch: String,
    },
    /// Stream state-change events until interrupted
    Listen,
    /// Exit once any instance enters STATE
    Wait {
        /// Execution state to wait for (e.g. completed, failed)
        state: String,
        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Print captured output tails
    Tail(tail::TailArgs),
    /// Show history of terminated instances
    #[command(alias = "hist")]
    History(history::HistoryArgs),
    /// Disable jobs matching the given patterns
    Disable {
        /// Treat patterns as regular expressions (full match)
        #[arg(long)]
        regex: bool,
        #[arg(required = true)]
        patterns: Vec<String>,
    },
    /// Remove disabled-job patterns
    Enable {
        #[arg(required = true)]
        patterns: Vec<String>,
    },
    /// List disabled-job patterns
    ListDisabled,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e
            .downcast_ref::<exit_error::ExitError>()
            .map_or(1, |exit| exit.code);
        let message = e.to_string();
        if !message.is_empty() {
            eprintln!("Error: {message}");
        }
        std::process::exit(code);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Exec(args) => exec::exec(args).await,
        Commands::Ps => ps::ps().await,
        Commands::Stop { selector } => stop::signal(selector, false).await,
        Commands::Interrupt { selector } => stop::signal(selector, true).await,
        Commands::Release { latch } => release::release(latch).await,
        Commands::Listen => listen::listen().await,
        Commands::Wait { state, timeout_ms } => wait::wait(state, timeout_ms).await,
        Commands::Tail(args) => tail::tail(args).await,
        Commands::History(args) => history::history(args).await,
        Commands::Disable { regex, patterns } => disable::disable(patterns, regex).await,
        Commands::Enable { patterns } => disable::enable(patterns).await,
        Commands::ListDisabled => disable::list_disabled().await,
    }
}
