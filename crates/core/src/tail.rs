// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded ring of the most recent output lines of one instance.
//!
//! Single writer (the output pump), any number of readers. Lines carry
//! absolute sequence numbers so a follower can resume after the window
//! moved, skipping evicted lines.

use crate::event::OutputLine;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Default ring capacity in lines.
pub const DEFAULT_TAIL_CAPACITY: usize = 100;

#[derive(Debug, Default)]
struct Inner {
    lines: VecDeque<OutputLine>,
    /// Absolute sequence number of `lines.front()`.
    first_seq: u64,
    overflow: u64,
    closed: bool,
}

/// Rolling tail of captured output.
#[derive(Debug)]
pub struct TailBuffer {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl TailBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a line, evicting the oldest when full.
    pub fn append(&self, line: OutputLine) {
        let mut inner = self.inner.lock();
        inner.lines.push_back(line);
        if inner.lines.len() > self.capacity {
            inner.lines.pop_front();
            inner.first_seq += 1;
            inner.overflow += 1;
        }
    }

    /// Current window, oldest first.
    pub fn snapshot(&self) -> Vec<OutputLine> {
        self.inner.lock().lines.iter().cloned().collect()
    }

    /// Lines with absolute sequence >= `cursor`, plus the next cursor.
    ///
    /// A cursor older than the window front silently skips the evicted
    /// lines. Returns an empty vec when the cursor is at the end.
    pub fn read_from(&self, cursor: u64) -> (Vec<OutputLine>, u64) {
        let inner = self.inner.lock();
        let start = cursor.max(inner.first_seq);
        let offset = (start - inner.first_seq) as usize;
        let lines: Vec<OutputLine> = inner.lines.iter().skip(offset).cloned().collect();
        let next = inner.first_seq + inner.lines.len() as u64;
        (lines, next)
    }

    /// Absolute sequence one past the newest line.
    pub fn end_seq(&self) -> u64 {
        let inner = self.inner.lock();
        inner.first_seq + inner.lines.len() as u64
    }

    /// Number of lines evicted due to overflow.
    pub fn overflow(&self) -> u64 {
        self.inner.lock().overflow
    }

    /// Mark end-of-stream; followers terminate after draining.
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl Default for TailBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_TAIL_CAPACITY)
    }
}

#[cfg(test)]
#[path = "tail_tests.rs"]
mod tests;
