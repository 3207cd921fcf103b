// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `taro tail` - print captured output tails.

use crate::client::DaemonClient;
use crate::commands::{client_error, exit_code_for_kind};
use crate::exit_error::ExitError;
use anyhow::Result;
use clap::Args;
use taro_core::{Event, OutputStream};
use taro_daemon::{Request, Response, TailView};

#[derive(Args)]
pub struct TailArgs {
    /// Follow the tail until the instance terminates
    #[arg(short = 'f', long)]
    pub follow: bool,

    /// Instance or job ID (all live instances when omitted)
    pub selector: Option<String>,
}

pub async fn tail(args: TailArgs) -> Result<()> {
    if args.follow {
        let Some(selector) = args.selector else {
            return Err(ExitError::new(1, "tail -f requires an instance or job ID").into());
        };
        return follow(selector).await;
    }

    let client = DaemonClient::for_query().map_err(client_error)?;
    let tails = client
        .expect(
            &Request::GetTail {
                selector: args.selector,
                follow: false,
            },
            |r| match r {
                Response::Tails { tails } => Ok(tails),
                other => Err(other),
            },
        )
        .await
        .map_err(client_error)?;

    if tails.is_empty() {
        println!("No live instances");
        return Ok(());
    }

    let multiple = tails.len() > 1;
    for view in &tails {
        print_view(view, multiple);
    }
    Ok(())
}

fn print_view(view: &TailView, with_header: bool) {
    if with_header {
        println!("==> {} ({}) <==", view.instance_id, view.state);
    }
    for line in &view.lines {
        print_line(line.stream, &line.text);
    }
}

fn print_line(stream: OutputStream, text: &str) {
    match stream {
        OutputStream::Stdout => println!("{text}"),
        OutputStream::Stderr => eprintln!("{text}"),
    }
}

async fn follow(selector: String) -> Result<()> {
    let client = DaemonClient::for_query().map_err(client_error)?;
    let mut conn = client
        .open(&Request::GetTail {
            selector: Some(selector),
            follow: true,
        })
        .await
        .map_err(client_error)?;

    match conn.response().await.map_err(client_error)? {
        Response::Subscribed => {}
        Response::Error { kind, message } => {
            return Err(ExitError::new(exit_code_for_kind(&kind), message).into());
        }
        _ => return Err(ExitError::new(2, "unexpected response from supervisor").into()),
    }

    while let Some(event) = conn.next_event().await.map_err(client_error)? {
        if let Event::OutputLine { stream, text, .. } = event {
            print_line(stream, &text);
        }
    }
    Ok(())
}
