// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `taro wait` - block until any instance enters a state.

use crate::client::DaemonClient;
use crate::commands::{client_error, exit_code_for_kind};
use crate::exit_error::ExitError;
use anyhow::Result;
use taro_core::ExecutionState;
use taro_daemon::{Request, Response};

pub async fn wait(state: String, timeout_ms: Option<u64>) -> Result<()> {
    let state = ExecutionState::parse(&state)
        .ok_or_else(|| ExitError::new(1, format!("unknown state: {state}")))?;

    let client = DaemonClient::for_query().map_err(client_error)?;
    let mut conn = client
        .open(&Request::Wait {
            state,
            timeout_ms,
        })
        .await
        .map_err(client_error)?;

    // The response arrives whenever the event does; no read deadline here
    match conn.response_blocking().await.map_err(client_error)? {
        Response::Waited { instance } => {
            println!("{} entered {}", instance.id, state);
            Ok(())
        }
        Response::Error { kind, message } => {
            Err(ExitError::new(exit_code_for_kind(&kind), message).into())
        }
        _ => Err(ExitError::new(2, "unexpected response from supervisor").into()),
    }
}
