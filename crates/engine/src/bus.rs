// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out event bus with bounded per-subscriber queues.
//!
//! Delivery never blocks the publisher indefinitely: output events are
//! dropped (newest first) when a queue is full; state events get a short
//! grace period before the oldest queued event is evicted, so state
//! history is less lossy than output. Per-instance order is preserved
//! for every subscriber because delivery is a FIFO queue per
//! subscription.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use taro_core::{Event, EventFilter};
use tokio::sync::Notify;
use tokio::time::Instant;

/// Default bound of a subscription queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// How long a state-event publish waits for queue space before evicting
/// the oldest queued event.
pub const STATE_ENQUEUE_DEADLINE: Duration = Duration::from_millis(50);

struct SubscriptionShared {
    id: u64,
    filter: EventFilter,
    capacity: usize,
    queue: Mutex<VecDeque<Event>>,
    /// Permit-style wakeup for the consumer.
    ready: Notify,
    /// Wakeup for publishers waiting on queue space.
    space: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl SubscriptionShared {
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.ready.notify_one();
        self.space.notify_one();
    }
}

struct BusInner {
    subs: Mutex<Vec<Arc<SubscriptionShared>>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn remove(&self, id: u64) {
        self.subs.lock().retain(|s| s.id != id);
    }
}

/// In-process publish/subscribe fabric.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                subs: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Create a subscription with a bounded queue.
    pub fn subscribe(&self, filter: EventFilter, capacity: usize) -> Subscription {
        let shared = Arc::new(SubscriptionShared {
            id: self.inner.next_id.fetch_add(1, Ordering::SeqCst),
            filter,
            capacity: capacity.max(1),
            queue: Mutex::new(VecDeque::new()),
            ready: Notify::new(),
            space: Notify::new(),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });
        self.inner.subs.lock().push(Arc::clone(&shared));
        Subscription {
            shared,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to every matching subscription.
    pub async fn publish(&self, event: Event) {
        let targets: Vec<Arc<SubscriptionShared>> = {
            let subs = self.inner.subs.lock();
            subs.iter()
                .filter(|s| s.filter.matches(&event))
                .cloned()
                .collect()
        };

        for sub in targets {
            deliver(&sub, event.clone()).await;
        }
    }

    /// Close every subscription; consumers see end-of-stream.
    pub fn close_all(&self) {
        let subs: Vec<_> = self.inner.subs.lock().drain(..).collect();
        for sub in subs {
            sub.close();
        }
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subs.lock().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

async fn deliver(sub: &SubscriptionShared, event: Event) {
    if sub.closed.load(Ordering::SeqCst) {
        return;
    }

    let block_briefly = event.is_state_changed();
    if !block_briefly {
        // Output policy: drop-newest when full
        let mut queue = sub.queue.lock();
        if queue.len() < sub.capacity {
            queue.push_back(event);
            drop(queue);
            sub.ready.notify_one();
        } else {
            sub.dropped.fetch_add(1, Ordering::Relaxed);
        }
        return;
    }

    // State policy: wait briefly for space, then evict the oldest
    let deadline = Instant::now() + STATE_ENQUEUE_DEADLINE;
    loop {
        {
            let mut queue = sub.queue.lock();
            if queue.len() < sub.capacity {
                queue.push_back(event);
                drop(queue);
                sub.ready.notify_one();
                return;
            }
        }
        if sub.closed.load(Ordering::SeqCst) {
            return;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            let mut queue = sub.queue.lock();
            if queue.len() >= sub.capacity {
                queue.pop_front();
                sub.dropped.fetch_add(1, Ordering::Relaxed);
            }
            queue.push_back(event);
            drop(queue);
            sub.ready.notify_one();
            return;
        }
        let _ = tokio::time::timeout(remaining, sub.space.notified()).await;
    }
}

/// Receiving end of one subscription. Single consumer.
pub struct Subscription {
    shared: Arc<SubscriptionShared>,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Next event, or `None` once the subscription is closed and drained.
    pub async fn recv(&self) -> Option<Event> {
        loop {
            {
                let mut queue = self.shared.queue.lock();
                if let Some(event) = queue.pop_front() {
                    drop(queue);
                    self.shared.space.notify_one();
                    return Some(event);
                }
            }
            if self.shared.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.shared.ready.notified().await;
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&self) -> Option<Event> {
        let event = self.shared.queue.lock().pop_front();
        if event.is_some() {
            self.shared.space.notify_one();
        }
        event
    }

    /// Events dropped on this subscription due to overflow.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Detach from the bus. After this returns no further events are
    /// delivered.
    pub fn unsubscribe(&self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.shared.id);
        }
        self.shared.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
