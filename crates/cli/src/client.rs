// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::daemon_process::{daemon_socket, start_daemon_background};
use taro_core::Event;
use taro_daemon::protocol::wire::{self, ProtocolError};
use taro_daemon::{Request, Response};
use thiserror::Error;
use tokio::net::UnixStream;

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for single request/response exchanges
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("TARO_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for the daemon to start
pub fn timeout_connect() -> Duration {
    parse_duration_ms("TARO_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

/// Polling interval for connection retries
pub fn poll_interval() -> Duration {
    parse_duration_ms("TARO_CONNECT_POLL_MS").unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Supervisor not running")]
    DaemonNotRunning,

    #[error("Failed to start supervisor: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for supervisor to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{message}")]
    Rejected { kind: String, message: String },

    #[error("Unexpected response from supervisor")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,
}

/// Daemon client
#[derive(Debug)]
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// For action commands (exec) - auto-starts the daemon when absent.
    pub fn for_action() -> Result<Self, ClientError> {
        match Self::connect() {
            Ok(client) => Ok(client),
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background()?;
                Self::connect_with_retry(timeout_connect(), child)
            }
            Err(e) => Err(e),
        }
    }

    /// For query and control commands - connect only, no auto-start.
    pub fn for_query() -> Result<Self, ClientError> {
        Self::connect()
    }

    /// Connect to existing daemon (no auto-start)
    fn connect() -> Result<Self, ClientError> {
        let socket_path = daemon_socket()?;

        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }

        Ok(Self { socket_path })
    }

    fn connect_with_retry(
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            // Check if daemon process exited early (startup failure)
            if let Ok(Some(status)) = child.try_wait() {
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {status}"
                )));
            }

            match Self::connect() {
                Ok(client) => {
                    // Verify the socket is accepting connections
                    if client.probe() {
                        return Ok(client);
                    }
                }
                Err(ClientError::DaemonNotRunning) => {}
                Err(e) => return Err(e),
            }
            std::thread::sleep(poll_interval());
        }

        Err(ClientError::DaemonStartTimeout)
    }

    fn probe(&self) -> bool {
        std::os::unix::net::UnixStream::connect(&self.socket_path).is_ok()
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send a request and receive its single response.
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let mut conn = self.open(request).await?;
        conn.response_with_timeout(timeout_ipc()).await
    }

    /// Send a request and keep the connection for streamed frames.
    pub async fn open(&self, request: &Request) -> Result<StreamConn, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path).await?;
        let data = wire::encode(request)?;
        tokio::time::timeout(timeout_ipc(), wire::write_message(&mut stream, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        Ok(StreamConn { stream })
    }

    /// Helper for requests that expect a specific success response.
    pub async fn expect<T>(
        &self,
        request: &Request,
        extract: impl FnOnce(Response) -> Result<T, Response>,
    ) -> Result<T, ClientError> {
        match self.send(request).await? {
            Response::Error { kind, message } => Err(ClientError::Rejected { kind, message }),
            response => extract(response).map_err(|_| ClientError::UnexpectedResponse),
        }
    }
}

/// An open connection carrying a response and then event frames.
pub struct StreamConn {
    stream: UnixStream,
}

impl StreamConn {
    /// Read the response frame with the standard IPC timeout.
    pub async fn response(&mut self) -> Result<Response, ClientError> {
        self.response_with_timeout(timeout_ipc()).await
    }

    async fn response_with_timeout(&mut self, timeout: Duration) -> Result<Response, ClientError> {
        let bytes = tokio::time::timeout(timeout, wire::read_message(&mut self.stream))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        Ok(wire::decode(&bytes)?)
    }

    /// Read the response frame without a deadline (blocking requests).
    pub async fn response_blocking(&mut self) -> Result<Response, ClientError> {
        let bytes = wire::read_message(&mut self.stream).await?;
        Ok(wire::decode(&bytes)?)
    }

    /// Next streamed event; `None` once the daemon closes the stream.
    pub async fn next_event(&mut self) -> Result<Option<Event>, ClientError> {
        match wire::read_message(&mut self.stream).await {
            Ok(bytes) => Ok(Some(wire::decode(&bytes)?)),
            Err(ProtocolError::ConnectionClosed) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
