// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `taro history` - query terminated-instance records.

use crate::client::DaemonClient;
use crate::commands::client_error;
use crate::output::{Column, Table};
use anyhow::Result;
use clap::Args;
use taro_core::{format_epoch_ms, JobId};
use taro_daemon::{Request, Response};
use taro_storage::{HistoryQuery, HistoryRecord, StateClass};

#[derive(Args)]
pub struct HistoryArgs {
    /// Only records of this job
    #[arg(long)]
    pub job: Option<String>,

    /// Only records created at or after this epoch-ms timestamp
    #[arg(long)]
    pub since: Option<u64>,

    /// Only records created before this epoch-ms timestamp
    #[arg(long)]
    pub until: Option<u64>,

    /// Only non-failure terminals (completed, stopped, disabled)
    #[arg(long, conflicts_with = "failed")]
    pub success: bool,

    /// Only failure terminals (interrupted, failed)
    #[arg(long)]
    pub failed: bool,
}

impl HistoryArgs {
    fn query(&self) -> HistoryQuery {
        HistoryQuery {
            job_id: self.job.clone().map(JobId::new),
            since: self.since,
            until: self.until,
            class: if self.success {
                StateClass::Success
            } else if self.failed {
                StateClass::Failure
            } else {
                StateClass::Any
            },
        }
    }
}

pub async fn history(args: HistoryArgs) -> Result<()> {
    let client = DaemonClient::for_query().map_err(client_error)?;
    let records = client
        .expect(
            &Request::History {
                query: args.query(),
            },
            |r| match r {
                Response::HistoryRecords { records } => Ok(records),
                other => Err(other),
            },
        )
        .await
        .map_err(client_error)?;

    if records.is_empty() {
        println!("No history records");
        return Ok(());
    }

    print!("{}", render(&records));
    Ok(())
}

fn render(records: &[HistoryRecord]) -> String {
    let mut table = Table::new(vec![
        Column::left("INSTANCE"),
        Column::left("JOB"),
        Column::left("STATE"),
        Column::left("CREATED"),
        Column::left("TERMINATED"),
        Column::right("EXIT"),
        Column::left("ERROR").with_max(40),
    ]);
    for record in records {
        table.row(vec![
            record.instance_id.to_string(),
            record.job_id.to_string(),
            record.state.to_string(),
            format_epoch_ms(record.created_at),
            format_epoch_ms(record.terminated_at),
            record
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            record.error.clone().unwrap_or_default(),
        ]);
    }
    table.render()
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
