// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `taro ps` - list live instances.

use crate::client::DaemonClient;
use crate::commands::client_error;
use crate::output::{Column, Table};
use anyhow::Result;
use std::time::{SystemTime, UNIX_EPOCH};
use taro_core::{format_elapsed_ms, format_epoch_ms, Snapshot};
use taro_daemon::{Request, Response};

pub async fn ps() -> Result<()> {
    let client = DaemonClient::for_query().map_err(client_error)?;
    let instances = client
        .expect(&Request::Ps, |r| match r {
            Response::Instances { instances } => Ok(instances),
            other => Err(other),
        })
        .await
        .map_err(client_error)?;

    if instances.is_empty() {
        println!("No live instances");
        return Ok(());
    }

    print!("{}", render(&instances));
    Ok(())
}

fn render(instances: &[Snapshot]) -> String {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;

    let mut table = Table::new(vec![
        Column::left("INSTANCE"),
        Column::left("JOB"),
        Column::left("STATE"),
        Column::left("CREATED"),
        Column::right("ELAPSED"),
        Column::left("COMMAND").with_max(48),
    ]);
    for snapshot in instances {
        let created = snapshot.created_at().unwrap_or(0);
        table.row(vec![
            snapshot.id.to_string(),
            snapshot.job_id.to_string(),
            snapshot.state.to_string(),
            format_epoch_ms(created),
            format_elapsed_ms(now_ms.saturating_sub(created)),
            snapshot.command_line.clone(),
        ]);
    }
    table.render()
}

#[cfg(test)]
#[path = "ps_tests.rs"]
mod tests;
