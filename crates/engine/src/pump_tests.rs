// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use taro_core::{EventFilter, FakeClock};

async fn pump_bytes(bytes: &'static [u8], capacity: usize) -> (Arc<TailBuffer>, crate::Subscription) {
    let bus = EventBus::new();
    let sub = bus.subscribe(EventFilter::output_only(), capacity);
    let tail = Arc::new(TailBuffer::new(100));
    let notify = Arc::new(Notify::new());

    let handle = OutputPump::spawn(
        InstanceId::new("j@1"),
        OutputStream::Stdout,
        bytes,
        Arc::clone(&tail),
        notify,
        bus.clone(),
        FakeClock::new(),
    );
    handle.await.unwrap();
    (tail, sub)
}

#[tokio::test]
async fn splits_lines_and_flushes_partial_tail() {
    let (tail, sub) = pump_bytes(b"hello\nworld", 16).await;

    let texts: Vec<_> = tail.snapshot().into_iter().map(|l| l.text).collect();
    assert_eq!(texts, ["hello", "world"]);

    let first = sub.recv().await.unwrap();
    match first {
        Event::OutputLine { text, stream, .. } => {
            assert_eq!(text, "hello");
            assert_eq!(stream, OutputStream::Stdout);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(sub.recv().await.is_some());
}

#[tokio::test]
async fn strips_crlf() {
    let (tail, _sub) = pump_bytes(b"one\r\ntwo\r\n", 16).await;
    let texts: Vec<_> = tail.snapshot().into_iter().map(|l| l.text).collect();
    assert_eq!(texts, ["one", "two"]);
}

#[tokio::test]
async fn invalid_utf8_replaced_not_fatal() {
    let (tail, _sub) = pump_bytes(b"ok\n\xff\xfe bad\nafter\n", 16).await;
    let texts: Vec<_> = tail.snapshot().into_iter().map(|l| l.text).collect();
    assert_eq!(texts.len(), 3);
    assert_eq!(texts[0], "ok");
    assert!(texts[1].contains('\u{FFFD}'));
    assert_eq!(texts[2], "after");
}

#[tokio::test]
async fn subscriber_overflow_never_loses_tail_lines() {
    let (tail, sub) = pump_bytes(b"1\n2\n3\n4\n5\n", 2).await;

    // Bus dropped the overflow, tail kept everything
    assert_eq!(tail.snapshot().len(), 5);
    assert_eq!(sub.dropped(), 3);
}

#[tokio::test]
async fn empty_input_produces_nothing() {
    let (tail, sub) = pump_bytes(b"", 16).await;
    assert!(tail.snapshot().is_empty());
    assert!(sub.try_recv().is_none());
}
