// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::{Path, PathBuf};
use taro_core::{ExecSpec, OutputStream};
use taro_engine::SupervisorConfig;
use taro_storage::HistoryStore;
use tokio::net::UnixStream;

struct TestDaemon {
    // Keeps the socket directory alive for the test duration
    _dir: tempfile::TempDir,
    socket: PathBuf,
    ctx: Arc<ListenCtx>,
}

fn start_daemon() -> TestDaemon {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("daemon.sock");
    let store = Arc::new(HistoryStore::open_in_memory().unwrap());
    let supervisor = Supervisor::new(Some(store), SupervisorConfig::default()).unwrap();
    let ctx = Arc::new(ListenCtx {
        supervisor,
        start_time: Instant::now(),
        shutdown: Arc::new(Notify::new()),
    });
    let listener = Listener::new(
        UnixListener::bind(&socket).unwrap(),
        Arc::clone(&ctx),
    );
    tokio::spawn(listener.run());
    TestDaemon {
        _dir: dir,
        socket,
        ctx,
    }
}

async fn connect_and_send(socket: &Path, request: &Request) -> UnixStream {
    let mut stream = UnixStream::connect(socket).await.unwrap();
    let data = wire::encode(request).unwrap();
    wire::write_message(&mut stream, &data).await.unwrap();
    stream
}

async fn read_response(stream: &mut UnixStream) -> Response {
    let bytes = wire::read_message(stream).await.unwrap();
    wire::decode(&bytes).unwrap()
}

async fn read_event(stream: &mut UnixStream) -> Event {
    let bytes = wire::read_message(stream).await.unwrap();
    wire::decode(&bytes).unwrap()
}

async fn request_response(socket: &Path, request: &Request) -> Response {
    let mut stream = connect_and_send(socket, request).await;
    read_response(&mut stream).await
}

/// Drive one exec to completion, returning its events.
async fn exec_to_terminal(socket: &Path, spec: ExecSpec) -> (taro_core::InstanceId, Vec<Event>) {
    let mut stream = connect_and_send(socket, &Request::Exec { spec }).await;
    let id = match read_response(&mut stream).await {
        Response::Started { instance_id } => instance_id,
        other => panic!("unexpected response: {other:?}"),
    };
    let mut events = Vec::new();
    loop {
        let event = read_event(&mut stream).await;
        let terminal = matches!(&event, Event::StateChanged { to, .. } if to.is_terminal());
        events.push(event);
        if terminal {
            break;
        }
    }
    (id, events)
}

#[tokio::test]
async fn ping_pong() {
    let daemon = start_daemon();
    assert_eq!(
        request_response(&daemon.socket, &Request::Ping).await,
        Response::Pong
    );
}

#[tokio::test]
async fn hello_reports_version() {
    let daemon = start_daemon();
    match request_response(
        &daemon.socket,
        &Request::Hello {
            version: "stale".to_string(),
        },
    )
    .await
    {
        Response::Hello { version } => assert_eq!(version, crate::VERSION),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn exec_streams_output_then_terminal() {
    let daemon = start_daemon();
    let (_, events) = exec_to_terminal(
        &daemon.socket,
        ExecSpec::new("greet", "echo").args(vec!["hi".into()]),
    )
    .await;

    let output: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            Event::OutputLine { text, stream, .. } => {
                assert_eq!(*stream, OutputStream::Stdout);
                Some(text.as_str())
            }
            _ => None,
        })
        .collect();
    assert_eq!(output, ["hi"]);

    match events.last().unwrap() {
        Event::StateChanged { to, instance, .. } => {
            assert_eq!(*to, ExecutionState::Completed);
            assert_eq!(instance.exit_code, Some(0));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn exec_spawn_failure_is_an_error_response() {
    let daemon = start_daemon();
    let response = request_response(
        &daemon.socket,
        &Request::Exec {
            spec: ExecSpec::new("ghost", "no-such-binary-here"),
        },
    )
    .await;
    match response {
        Response::Error { kind, .. } => assert_eq!(kind, "spawn_failure"),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn pending_exec_releases_via_second_connection() {
    let daemon = start_daemon();

    let mut exec_stream = connect_and_send(
        &daemon.socket,
        &Request::Exec {
            spec: ExecSpec::new("batch", "true").pending_latch("morning"),
        },
    )
    .await;
    match read_response(&mut exec_stream).await {
        Response::Started { .. } => {}
        other => panic!("unexpected response: {other:?}"),
    }

    // First streamed event is the PENDING transition
    match read_event(&mut exec_stream).await {
        Event::StateChanged { to, .. } => assert_eq!(to, ExecutionState::Pending),
        other => panic!("unexpected event: {other:?}"),
    }

    match request_response(
        &daemon.socket,
        &Request::Release {
            latch: "morning".to_string(),
        },
    )
    .await
    {
        Response::Released { count } => assert_eq!(count, 1),
        other => panic!("unexpected response: {other:?}"),
    }

    // The exec stream continues through RUNNING to COMPLETED
    let mut saw_running = false;
    loop {
        match read_event(&mut exec_stream).await {
            Event::StateChanged { to, .. } if to == ExecutionState::Running => saw_running = true,
            Event::StateChanged { to, .. } if to.is_terminal() => {
                assert_eq!(to, ExecutionState::Completed);
                break;
            }
            _ => {}
        }
    }
    assert!(saw_running);
}

#[tokio::test]
async fn stop_unknown_selector() {
    let daemon = start_daemon();
    match request_response(
        &daemon.socket,
        &Request::Stop {
            selector: "nope".to_string(),
        },
    )
    .await
    {
        Response::Error { kind, .. } => assert_eq!(kind, "unknown_instance"),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn ps_shows_live_instance_until_stopped() {
    let daemon = start_daemon();
    let mut exec_stream = connect_and_send(
        &daemon.socket,
        &Request::Exec {
            spec: ExecSpec::new("sleeper", "sleep").args(vec!["30".into()]),
        },
    )
    .await;
    let id = match read_response(&mut exec_stream).await {
        Response::Started { instance_id } => instance_id,
        other => panic!("unexpected response: {other:?}"),
    };

    match request_response(&daemon.socket, &Request::Ps).await {
        Response::Instances { instances } => {
            assert_eq!(instances.len(), 1);
            assert_eq!(instances[0].id, id);
            assert_eq!(instances[0].state, ExecutionState::Running);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    match request_response(
        &daemon.socket,
        &Request::Stop {
            selector: id.to_string(),
        },
    )
    .await
    {
        Response::Signalled { count } => assert_eq!(count, 1),
        other => panic!("unexpected response: {other:?}"),
    }

    // The exec stream ends with STOPPED
    loop {
        match read_event(&mut exec_stream).await {
            Event::StateChanged { to, .. } if to.is_terminal() => {
                assert_eq!(to, ExecutionState::Stopped);
                break;
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn subscribe_streams_state_events() {
    let daemon = start_daemon();
    let mut sub_stream = connect_and_send(
        &daemon.socket,
        &Request::Subscribe {
            filter: EventFilter::states_only(),
        },
    )
    .await;
    assert_eq!(read_response(&mut sub_stream).await, Response::Subscribed);

    exec_to_terminal(&daemon.socket, ExecSpec::new("quick", "true")).await;

    let mut states = Vec::new();
    loop {
        match read_event(&mut sub_stream).await {
            Event::StateChanged { to, .. } => {
                states.push(to);
                if to.is_terminal() {
                    break;
                }
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(states, vec![ExecutionState::Running, ExecutionState::Completed]);
}

#[tokio::test]
async fn wait_matches_and_times_out() {
    let daemon = start_daemon();

    // Timeout path
    match request_response(
        &daemon.socket,
        &Request::Wait {
            state: ExecutionState::Stopped,
            timeout_ms: Some(50),
        },
    )
    .await
    {
        Response::Error { kind, .. } => assert_eq!(kind, "timeout"),
        other => panic!("unexpected response: {other:?}"),
    }

    // Match path: start the waiter, then complete an instance
    let mut wait_stream = connect_and_send(
        &daemon.socket,
        &Request::Wait {
            state: ExecutionState::Completed,
            timeout_ms: Some(10_000),
        },
    )
    .await;
    // Give the wait request time to subscribe
    tokio::time::sleep(Duration::from_millis(50)).await;
    exec_to_terminal(&daemon.socket, ExecSpec::new("quick", "true")).await;

    match read_response(&mut wait_stream).await {
        Response::Waited { instance } => assert_eq!(instance.state, ExecutionState::Completed),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn history_and_tail_for_terminated_instance() {
    let daemon = start_daemon();
    let (id, _) = exec_to_terminal(
        &daemon.socket,
        ExecSpec::new("greet", "echo").args(vec!["hi".into()]),
    )
    .await;

    match request_response(
        &daemon.socket,
        &Request::History {
            query: Default::default(),
        },
    )
    .await
    {
        Response::HistoryRecords { records } => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].instance_id, id);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    // The live table no longer knows the instance; history serves the tail
    match request_response(
        &daemon.socket,
        &Request::GetTail {
            selector: Some(id.to_string()),
            follow: false,
        },
    )
    .await
    {
        Response::Tails { tails } => {
            assert_eq!(tails.len(), 1);
            assert_eq!(tails[0].lines.len(), 1);
            assert_eq!(tails[0].lines[0].text, "hi");
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn disable_enable_list_round_trip() {
    let daemon = start_daemon();

    match request_response(
        &daemon.socket,
        &Request::Disable {
            patterns: vec!["nightly".to_string()],
            regex: false,
            by: "tests".to_string(),
        },
    )
    .await
    {
        Response::Disabled { records } => assert_eq!(records.len(), 1),
        other => panic!("unexpected response: {other:?}"),
    }

    // A disabled job is admitted but never runs
    let (_, events) = exec_to_terminal(&daemon.socket, ExecSpec::new("nightly", "true")).await;
    match events.last().unwrap() {
        Event::StateChanged { to, .. } => assert_eq!(*to, ExecutionState::Disabled),
        other => panic!("unexpected event: {other:?}"),
    }

    match request_response(&daemon.socket, &Request::ListDisabled).await {
        Response::DisabledList { records } => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].pattern, "nightly");
        }
        other => panic!("unexpected response: {other:?}"),
    }

    match request_response(
        &daemon.socket,
        &Request::Enable {
            patterns: vec!["nightly".to_string()],
        },
    )
    .await
    {
        Response::Enabled { count } => assert_eq!(count, 1),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn follow_tail_streams_lines() {
    let daemon = start_daemon();
    let mut exec_stream = connect_and_send(
        &daemon.socket,
        &Request::Exec {
            spec: ExecSpec::new("drip", "sh").args(vec![
                "-c".into(),
                "echo first; sleep 1; echo second".into(),
            ]),
        },
    )
    .await;
    let id = match read_response(&mut exec_stream).await {
        Response::Started { instance_id } => instance_id,
        other => panic!("unexpected response: {other:?}"),
    };

    let mut tail_stream = connect_and_send(
        &daemon.socket,
        &Request::GetTail {
            selector: Some(id.to_string()),
            follow: true,
        },
    )
    .await;
    assert_eq!(read_response(&mut tail_stream).await, Response::Subscribed);

    let mut texts = Vec::new();
    loop {
        let bytes = match wire::read_message(&mut tail_stream).await {
            Ok(bytes) => bytes,
            // Stream ends when the instance terminates
            Err(ProtocolError::ConnectionClosed) => break,
            Err(e) => panic!("read failed: {e}"),
        };
        match wire::decode::<Event>(&bytes).unwrap() {
            Event::OutputLine { text, .. } => texts.push(text),
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(texts, ["first", "second"]);
}

#[tokio::test]
async fn status_and_shutdown() {
    let daemon = start_daemon();
    match request_response(&daemon.socket, &Request::Status).await {
        Response::Status { live, .. } => assert_eq!(live, 0),
        other => panic!("unexpected response: {other:?}"),
    }

    assert_eq!(
        request_response(&daemon.socket, &Request::Shutdown).await,
        Response::ShuttingDown
    );
    // The shutdown notification is queued for the main loop
    tokio::time::timeout(Duration::from_secs(1), daemon.ctx.shutdown.notified())
        .await
        .unwrap();
}
