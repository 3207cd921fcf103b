// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination of PENDING instances awaiting named release tokens.

use crate::EngineError;
use parking_lot::Mutex;
use std::collections::HashMap;
use taro_core::InstanceId;

/// Maps latch names to the instances waiting on them, in registration
/// order. A latch exists exactly as long as it has waiters.
#[derive(Default)]
pub struct LatchRegistry {
    waiters: Mutex<HashMap<String, Vec<InstanceId>>>,
}

impl LatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `instance_id` waits on `latch`.
    pub fn register(&self, instance_id: InstanceId, latch: &str) {
        self.waiters
            .lock()
            .entry(latch.to_string())
            .or_default()
            .push(instance_id);
    }

    /// Atomically take all waiters of `latch`, in registration order.
    pub fn release(&self, latch: &str) -> Result<Vec<InstanceId>, EngineError> {
        self.waiters
            .lock()
            .remove(latch)
            .ok_or_else(|| EngineError::UnknownLatch(latch.to_string()))
    }

    /// Remove one waiter (stop/interrupt while pending). Returns whether
    /// the instance was waiting.
    pub fn cancel(&self, instance_id: &InstanceId) -> bool {
        let mut waiters = self.waiters.lock();
        let mut found = false;
        waiters.retain(|_, ids| {
            let before = ids.len();
            ids.retain(|id| id != instance_id);
            found |= ids.len() < before;
            !ids.is_empty()
        });
        found
    }

    /// Instances currently pending on `latch`.
    pub fn waiting_on(&self, latch: &str) -> Vec<InstanceId> {
        self.waiters.lock().get(latch).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "latch_tests.rs"]
mod tests;
