// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event::OutputStream;

fn line(n: u64) -> OutputLine {
    OutputLine {
        stream: OutputStream::Stdout,
        text: format!("line-{n}"),
        at: n,
    }
}

#[test]
fn snapshot_in_order() {
    let tail = TailBuffer::new(10);
    for n in 0..3 {
        tail.append(line(n));
    }
    let texts: Vec<_> = tail.snapshot().into_iter().map(|l| l.text).collect();
    assert_eq!(texts, ["line-0", "line-1", "line-2"]);
}

#[test]
fn overflow_keeps_last_n_in_order() {
    let tail = TailBuffer::new(3);
    for n in 0..8 {
        tail.append(line(n));
    }
    let texts: Vec<_> = tail.snapshot().into_iter().map(|l| l.text).collect();
    assert_eq!(texts, ["line-5", "line-6", "line-7"]);
    assert_eq!(tail.overflow(), 5);
}

#[test]
fn read_from_cursor() {
    let tail = TailBuffer::new(10);
    for n in 0..4 {
        tail.append(line(n));
    }

    let (lines, next) = tail.read_from(0);
    assert_eq!(lines.len(), 4);
    assert_eq!(next, 4);

    let (lines, next) = tail.read_from(next);
    assert!(lines.is_empty());
    assert_eq!(next, 4);

    tail.append(line(4));
    let (lines, next) = tail.read_from(next);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text, "line-4");
    assert_eq!(next, 5);
}

#[test]
fn stale_cursor_skips_evicted_lines() {
    let tail = TailBuffer::new(2);
    for n in 0..5 {
        tail.append(line(n));
    }
    // Window is [line-3, line-4]; cursor 0 jumps to the window front
    let (lines, next) = tail.read_from(0);
    let texts: Vec<_> = lines.into_iter().map(|l| l.text).collect();
    assert_eq!(texts, ["line-3", "line-4"]);
    assert_eq!(next, 5);
}

#[test]
fn close_marks_end_of_stream() {
    let tail = TailBuffer::new(2);
    assert!(!tail.is_closed());
    tail.close();
    assert!(tail.is_closed());
    // Still readable after close
    tail.append(line(0));
    assert_eq!(tail.snapshot().len(), 1);
}

#[test]
fn zero_capacity_clamped_to_one() {
    let tail = TailBuffer::new(0);
    tail.append(line(0));
    tail.append(line(1));
    assert_eq!(tail.snapshot().len(), 1);
    assert_eq!(tail.snapshot()[0].text, "line-1");
}
