// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reads child output line by line into the tail ring and the event bus.
//!
//! One pump task per stream. The pump never blocks on slow subscribers:
//! the tail write always succeeds and the bus applies its drop policy.
//! Decoding never fails; invalid UTF-8 is replaced with the substitution
//! marker.

use crate::bus::EventBus;
use std::sync::Arc;
use taro_core::{Clock, Event, InstanceId, OutputLine, OutputStream, TailBuffer};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Pump for one instance's output streams.
pub struct OutputPump;

impl OutputPump {
    /// Spawn a task reading `reader` until EOF.
    ///
    /// Lines are delimited by newline; a final partial line is flushed on
    /// EOF. `notify` wakes tail followers after each append.
    pub fn spawn<R, C>(
        instance_id: InstanceId,
        stream: OutputStream,
        reader: R,
        tail: Arc<TailBuffer>,
        notify: Arc<Notify>,
        bus: EventBus,
        clock: C,
    ) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        C: Clock + 'static,
    {
        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        if buf.last() == Some(&b'\n') {
                            buf.pop();
                            if buf.last() == Some(&b'\r') {
                                buf.pop();
                            }
                        }
                        let line = OutputLine {
                            stream,
                            text: String::from_utf8_lossy(&buf).into_owned(),
                            at: clock.epoch_ms(),
                        };
                        tail.append(line.clone());
                        notify.notify_waiters();
                        bus.publish(Event::OutputLine {
                            instance_id: instance_id.clone(),
                            stream,
                            text: line.text,
                            at: line.at,
                        })
                        .await;
                    }
                    Err(e) => {
                        tracing::debug!(instance = %instance_id, %stream, error = %e, "output read failed");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "pump_tests.rs"]
mod tests;
