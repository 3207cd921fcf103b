// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI subcommand handlers.

pub mod disable;
pub mod exec;
pub mod history;
pub mod listen;
pub mod ps;
pub mod release;
pub mod stop;
pub mod tail;
pub mod wait;

use crate::client::ClientError;
use crate::exit_error::{
    ExitError, EXIT_PERSISTENCE_REQUIRED, EXIT_UNREACHABLE, EXIT_USER_ERROR,
};

/// Map a daemon error kind to the documented exit codes.
pub(crate) fn exit_code_for_kind(kind: &str) -> i32 {
    match kind {
        "persistence_required" => EXIT_PERSISTENCE_REQUIRED,
        _ => EXIT_USER_ERROR,
    }
}

/// Convert a client error into an `ExitError`-carrying anyhow error.
pub(crate) fn client_error(e: ClientError) -> anyhow::Error {
    let code = match &e {
        ClientError::DaemonNotRunning
        | ClientError::DaemonStartFailed(_)
        | ClientError::DaemonStartTimeout
        | ClientError::Io(_)
        | ClientError::Protocol(_)
        | ClientError::UnexpectedResponse => EXIT_UNREACHABLE,
        ClientError::Rejected { kind, .. } => exit_code_for_kind(kind),
        ClientError::NoStateDir => EXIT_USER_ERROR,
    };
    ExitError::new(code, e.to_string()).into()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
