// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `taro listen` - stream state-change events.

use crate::client::DaemonClient;
use crate::commands::client_error;
use crate::exit_error::ExitError;
use anyhow::Result;
use taro_core::{format_epoch_ms, Event, EventFilter};
use taro_daemon::{Request, Response};

pub async fn listen() -> Result<()> {
    let client = DaemonClient::for_query().map_err(client_error)?;
    let mut conn = client
        .open(&Request::Subscribe {
            filter: EventFilter::states_only(),
        })
        .await
        .map_err(client_error)?;

    match conn.response().await.map_err(client_error)? {
        Response::Subscribed => {}
        Response::Error { message, .. } => return Err(ExitError::new(1, message).into()),
        _ => return Err(ExitError::new(2, "unexpected response from supervisor").into()),
    }

    while let Some(event) = conn.next_event().await.map_err(client_error)? {
        if let Event::StateChanged { instance, from, to, at } = event {
            println!("{}  {}  {} -> {}", format_epoch_ms(at), instance.id, from, to);
        }
    }
    Ok(())
}
