// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `taro stop` / `taro interrupt` - request termination.

use crate::client::DaemonClient;
use crate::commands::client_error;
use anyhow::Result;
use taro_daemon::{Request, Response};

/// Send a stop or interrupt request for an instance or job selector.
pub async fn signal(selector: String, interrupt: bool) -> Result<()> {
    let request = if interrupt {
        Request::Interrupt { selector }
    } else {
        Request::Stop { selector }
    };

    let client = DaemonClient::for_query().map_err(client_error)?;
    let count = client
        .expect(&request, |r| match r {
            Response::Signalled { count } => Ok(count),
            other => Err(other),
        })
        .await
        .map_err(client_error)?;

    println!("Signalled {count} instance(s)");
    Ok(())
}
