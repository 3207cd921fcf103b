// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `taro exec` - admit a job instance and follow it to termination.

use crate::client::DaemonClient;
use crate::commands::{client_error, exit_code_for_kind};
use crate::exit_error::ExitError;
use anyhow::Result;
use clap::Args;
use taro_core::{Event, ExecSpec, OutputStream};
use taro_daemon::{Request, Response};

#[derive(Args)]
pub struct ExecArgs {
    /// Job ID (defaults to the command line)
    #[arg(long)]
    pub id: Option<String>,

    /// Hold the instance PENDING until LATCH is released
    #[arg(long, value_name = "LATCH")]
    pub pending: Option<String>,

    /// Bypass output capture (no tail, no output events)
    #[arg(short = 'b', long)]
    pub bypass_output: bool,

    /// Command and arguments to run
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl ExecArgs {
    fn spec(&self) -> ExecSpec {
        let job_id = self
            .id
            .clone()
            .unwrap_or_else(|| self.command.join(" "));
        let mut spec = ExecSpec::new(job_id, self.command[0].clone())
            .args(self.command[1..].to_vec())
            .bypass_output(self.bypass_output);
        if let Some(latch) = &self.pending {
            spec = spec.pending_latch(latch.clone());
        }
        spec
    }
}

pub async fn exec(args: ExecArgs) -> Result<()> {
    let spec = args.spec();
    let client = DaemonClient::for_action().map_err(client_error)?;
    let mut conn = client
        .open(&Request::Exec { spec })
        .await
        .map_err(client_error)?;

    match conn.response().await.map_err(client_error)? {
        Response::Started { instance_id } => {
            eprintln!("instance: {instance_id}");
        }
        Response::Error { kind, message } => {
            return Err(ExitError::new(exit_code_for_kind(&kind), message).into());
        }
        _ => return Err(ExitError::new(2, "unexpected response from supervisor").into()),
    }

    while let Some(event) = conn.next_event().await.map_err(client_error)? {
        match event {
            Event::OutputLine { stream, text, .. } => match stream {
                OutputStream::Stdout => println!("{text}"),
                OutputStream::Stderr => eprintln!("{text}"),
            },
            Event::StateChanged { instance, to, .. } if to.is_terminal() => {
                if to.is_failure() {
                    match &instance.error {
                        Some(error) => eprintln!("{to}: {error}"),
                        None => eprintln!("{to}"),
                    }
                    let code = instance.exit_code.filter(|c| *c != 0).unwrap_or(1);
                    return Err(ExitError::silent(code).into());
                }
                eprintln!("{to}");
                return Ok(());
            }
            Event::StateChanged { .. } => {}
        }
    }

    // Stream ended without a terminal event: the daemon went away
    Err(ExitError::new(2, "supervisor closed the event stream").into())
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
