// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `taro disable` / `enable` / `list-disabled` - the admission filter.

use crate::client::DaemonClient;
use crate::commands::client_error;
use crate::output::{Column, Table};
use anyhow::Result;
use taro_core::format_epoch_ms;
use taro_daemon::{Request, Response};

fn caller() -> String {
    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}

pub async fn disable(patterns: Vec<String>, regex: bool) -> Result<()> {
    let client = DaemonClient::for_query().map_err(client_error)?;
    let records = client
        .expect(
            &Request::Disable {
                patterns,
                regex,
                by: caller(),
            },
            |r| match r {
                Response::Disabled { records } => Ok(records),
                other => Err(other),
            },
        )
        .await
        .map_err(client_error)?;

    println!("Disabled {} pattern(s)", records.len());
    Ok(())
}

pub async fn enable(patterns: Vec<String>) -> Result<()> {
    let client = DaemonClient::for_query().map_err(client_error)?;
    let count = client
        .expect(&Request::Enable { patterns }, |r| match r {
            Response::Enabled { count } => Ok(count),
            other => Err(other),
        })
        .await
        .map_err(client_error)?;

    println!("Enabled {count} pattern(s)");
    Ok(())
}

pub async fn list_disabled() -> Result<()> {
    let client = DaemonClient::for_query().map_err(client_error)?;
    let records = client
        .expect(&Request::ListDisabled, |r| match r {
            Response::DisabledList { records } => Ok(records),
            other => Err(other),
        })
        .await
        .map_err(client_error)?;

    if records.is_empty() {
        println!("No disabled jobs");
        return Ok(());
    }

    let mut table = Table::new(vec![
        Column::left("PATTERN"),
        Column::left("KIND"),
        Column::left("DISABLED"),
        Column::left("BY"),
    ]);
    for record in &records {
        table.row(vec![
            record.pattern.clone(),
            record.kind.as_str().to_string(),
            format_epoch_ms(record.disabled_at),
            record.disabled_by.clone(),
        ]);
    }
    print!("{}", table.render());
    Ok(())
}
