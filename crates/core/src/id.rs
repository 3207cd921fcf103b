// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes and instance-ID allocation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>` implementations.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Name of a job as chosen by the caller.
    ///
    /// Several instances may share a job ID; disable patterns and history
    /// grouping operate on it.
    #[derive(Default)]
    pub struct JobId;
}

define_id! {
    /// Identifier of one execution of a job.
    ///
    /// Unique within a supervisor's lifetime: `"<job_id>@<seq>"` where the
    /// sequence number is monotonically increasing across all jobs.
    #[derive(Default)]
    pub struct InstanceId;
}

/// Allocates instance IDs from a monotonic counter.
#[derive(Clone)]
pub struct InstanceIdGen {
    counter: Arc<AtomicU64>,
}

impl InstanceIdGen {
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Allocate the next instance ID for `job_id`.
    pub fn next(&self, job_id: &JobId) -> InstanceId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        InstanceId::new(format!("{}@{}", job_id, n))
    }
}

impl Default for InstanceIdGen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
