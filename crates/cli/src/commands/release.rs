// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `taro release` - release pending instances.

use crate::client::DaemonClient;
use crate::commands::client_error;
use anyhow::Result;
use taro_daemon::{Request, Response};

pub async fn release(latch: String) -> Result<()> {
    let client = DaemonClient::for_query().map_err(client_error)?;
    let count = client
        .expect(&Request::Release { latch }, |r| match r {
            Response::Released { count } => Ok(count),
            other => Err(other),
        })
        .await
        .map_err(client_error)?;

    println!("Released {count} instance(s)");
    Ok(())
}
