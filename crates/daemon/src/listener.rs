// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! Accepts connections and handles each in a spawned task so a slow
//! client never blocks the supervisor. Most requests are one
//! request/response exchange; `Exec`, `Subscribe`, and a following
//! `GetTail` continue with a stream of event frames.

use std::sync::Arc;
use std::time::{Duration, Instant};

use taro_core::{Event, EventFilter, ExecutionState};
use taro_engine::{EngineError, Supervisor};
use taro_storage::PatternKind;
use thiserror::Error;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use crate::protocol::wire::{self, ProtocolError, DEFAULT_TIMEOUT};
use crate::protocol::{Request, Response, TailView};

/// Upper bound for `Wait` without an explicit deadline (~1 year).
const WAIT_FOREVER: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Shared context for connection handlers.
pub struct ListenCtx {
    pub supervisor: Arc<Supervisor>,
    pub start_time: Instant,
    pub shutdown: Arc<Notify>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Listener task for accepting socket connections.
pub struct Listener {
    socket: UnixListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(socket: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { socket, ctx }
    }

    /// Run the accept loop, spawning a task per connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, ctx).await {
                            match e {
                                ConnectionError::Protocol(ProtocolError::ConnectionClosed) => {
                                    debug!("Client disconnected")
                                }
                                ConnectionError::Protocol(ProtocolError::Timeout) => {
                                    warn!("Connection timeout")
                                }
                                _ => error!("Connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(stream: UnixStream, ctx: Arc<ListenCtx>) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();
    let request = wire::read_request(&mut reader, DEFAULT_TIMEOUT).await?;
    debug!(?request, "request received");

    match request {
        Request::Ping => respond(&mut writer, Response::Pong).await,

        Request::Hello { version } => {
            if version != crate::VERSION {
                debug!(client = %version, daemon = %crate::VERSION, "version skew");
            }
            respond(
                &mut writer,
                Response::Hello {
                    version: crate::VERSION.to_string(),
                },
            )
            .await
        }

        Request::Exec { spec } => handle_exec(&mut writer, &ctx, spec).await,

        Request::Ps => {
            respond(
                &mut writer,
                Response::Instances {
                    instances: ctx.supervisor.ps(),
                },
            )
            .await
        }

        Request::Stop { selector } => {
            let response = match ctx.supervisor.stop(&selector).await {
                Ok(count) => Response::Signalled { count },
                Err(e) => Response::from_engine_error(&e),
            };
            respond(&mut writer, response).await
        }

        Request::Interrupt { selector } => {
            let response = match ctx.supervisor.interrupt(&selector).await {
                Ok(count) => Response::Signalled { count },
                Err(e) => Response::from_engine_error(&e),
            };
            respond(&mut writer, response).await
        }

        Request::Release { latch } => {
            let response = match ctx.supervisor.release(&latch).await {
                Ok(count) => Response::Released { count },
                Err(e) => Response::from_engine_error(&e),
            };
            respond(&mut writer, response).await
        }

        Request::Subscribe { filter } => handle_subscribe(&mut writer, &ctx, filter).await,

        Request::Wait { state, timeout_ms } => handle_wait(&mut writer, &ctx, state, timeout_ms).await,

        Request::GetTail { selector, follow } => {
            handle_tail(&mut writer, &ctx, selector, follow).await
        }

        Request::History { query } => {
            let response = match ctx.supervisor.history(&query) {
                Ok(records) => Response::HistoryRecords { records },
                Err(e) => Response::from_engine_error(&e),
            };
            respond(&mut writer, response).await
        }

        Request::Disable { patterns, regex, by } => {
            let kind = if regex {
                PatternKind::Regex
            } else {
                PatternKind::Exact
            };
            let response = match ctx.supervisor.disable(&patterns, kind, &by) {
                Ok(records) => Response::Disabled { records },
                Err(e) => Response::from_engine_error(&e),
            };
            respond(&mut writer, response).await
        }

        Request::Enable { patterns } => {
            let response = match ctx.supervisor.enable(&patterns) {
                Ok(count) => Response::Enabled { count },
                Err(e) => Response::from_engine_error(&e),
            };
            respond(&mut writer, response).await
        }

        Request::ListDisabled => {
            let response = match ctx.supervisor.list_disabled() {
                Ok(records) => Response::DisabledList { records },
                Err(e) => Response::from_engine_error(&e),
            };
            respond(&mut writer, response).await
        }

        Request::Status => {
            respond(
                &mut writer,
                Response::Status {
                    uptime_secs: ctx.start_time.elapsed().as_secs(),
                    live: ctx.supervisor.live_count(),
                },
            )
            .await
        }

        Request::Shutdown => {
            respond(&mut writer, Response::ShuttingDown).await?;
            ctx.shutdown.notify_one();
            Ok(())
        }
    }
}

async fn respond(writer: &mut OwnedWriteHalf, response: Response) -> Result<(), ConnectionError> {
    wire::write_response(writer, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

/// Write one event as a stream frame.
async fn write_event(writer: &mut OwnedWriteHalf, event: &Event) -> Result<(), ProtocolError> {
    let data = wire::encode(event)?;
    wire::write_message(writer, &data).await
}

/// Admit an instance and stream its events until terminal.
///
/// The subscription is created before admission so no event can be
/// missed; events of other instances are filtered out here.
async fn handle_exec(
    writer: &mut OwnedWriteHalf,
    ctx: &ListenCtx,
    spec: taro_core::ExecSpec,
) -> Result<(), ConnectionError> {
    let sub = ctx.supervisor.subscribe(EventFilter::all());

    let id = match ctx.supervisor.execute(spec).await {
        Ok(id) => id,
        Err(e) => return respond(writer, Response::from_engine_error(&e)).await,
    };
    respond(writer, Response::Started { instance_id: id.clone() }).await?;

    while let Some(event) = sub.recv().await {
        if event.instance_id() != &id {
            continue;
        }
        let terminal =
            matches!(&event, Event::StateChanged { to, .. } if to.is_terminal());
        if write_event(writer, &event).await.is_err() {
            break;
        }
        if terminal {
            break;
        }
    }
    Ok(())
}

/// Stream events matching the filter until the client goes away.
async fn handle_subscribe(
    writer: &mut OwnedWriteHalf,
    ctx: &ListenCtx,
    filter: EventFilter,
) -> Result<(), ConnectionError> {
    let sub = ctx.supervisor.subscribe(filter);
    respond(writer, Response::Subscribed).await?;

    while let Some(event) = sub.recv().await {
        if write_event(writer, &event).await.is_err() {
            break;
        }
    }
    Ok(())
}

async fn handle_wait(
    writer: &mut OwnedWriteHalf,
    ctx: &ListenCtx,
    state: ExecutionState,
    timeout_ms: Option<u64>,
) -> Result<(), ConnectionError> {
    let timeout = timeout_ms.map_or(WAIT_FOREVER, Duration::from_millis);
    let result = ctx
        .supervisor
        .wait_for(
            EventFilter::states_only(),
            |e| matches!(e, Event::StateChanged { to, .. } if *to == state),
            timeout,
        )
        .await;

    let response = match result {
        Ok(Event::StateChanged { instance, .. }) => Response::Waited { instance },
        Ok(_) => Response::invalid_request("unexpected event kind"),
        Err(e) => Response::from_engine_error(&e),
    };
    respond(writer, response).await
}

/// Tail windows, with optional follow streaming for one instance.
async fn handle_tail(
    writer: &mut OwnedWriteHalf,
    ctx: &ListenCtx,
    selector: Option<String>,
    follow: bool,
) -> Result<(), ConnectionError> {
    if follow {
        let Some(selector) = selector else {
            return respond(writer, Response::invalid_request("follow requires an instance"))
                .await;
        };
        let (snapshot, mut follower) = match ctx.supervisor.follow_tail(&selector) {
            Ok(pair) => pair,
            Err(e) => return respond(writer, Response::from_engine_error(&e)).await,
        };
        respond(writer, Response::Subscribed).await?;

        while let Some(batch) = follower.next_batch().await {
            for line in batch {
                let event = Event::OutputLine {
                    instance_id: snapshot.id.clone(),
                    stream: line.stream,
                    text: line.text,
                    at: line.at,
                };
                if write_event(writer, &event).await.is_err() {
                    return Ok(());
                }
            }
        }
        return Ok(());
    }

    let response = match ctx.supervisor.tails(selector.as_deref()) {
        Ok(tails) => Response::Tails {
            tails: tails
                .iter()
                .map(|(snapshot, lines)| TailView::from_snapshot(snapshot, lines.clone()))
                .collect(),
        },
        // A terminated instance is still visible through its history record
        Err(EngineError::UnknownInstance(_)) if selector.is_some() => {
            let id = taro_core::InstanceId::new(selector.unwrap_or_default());
            match ctx.supervisor.history_get(&id) {
                Ok(Some(record)) => Response::Tails {
                    tails: vec![TailView::from_history(&record)],
                },
                Ok(None) => Response::from_engine_error(&EngineError::UnknownInstance(
                    id.to_string(),
                )),
                Err(e) => Response::from_engine_error(&e),
            }
        }
        Err(e) => Response::from_engine_error(&e),
    };
    respond(writer, response).await
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
