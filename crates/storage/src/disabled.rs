// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Disabled-job registry: persisted patterns consulted at admission.

use crate::{HistoryStore, StorageError};
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taro_core::JobId;

/// How a disabled pattern matches job IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Literal comparison against the whole job ID.
    Exact,
    /// Regular expression, full-match against the job ID.
    Regex,
}

impl PatternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::Exact => "exact",
            PatternKind::Regex => "regex",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "exact" => Some(PatternKind::Exact),
            "regex" => Some(PatternKind::Regex),
            _ => None,
        }
    }
}

/// One persisted disable entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisabledRecord {
    pub pattern: String,
    pub kind: PatternKind,
    pub disabled_at: u64,
    pub disabled_by: String,
}

enum Matcher {
    Exact(String),
    Regex(Regex),
}

impl Matcher {
    fn compile(record: &DisabledRecord) -> Result<Self, StorageError> {
        match record.kind {
            PatternKind::Exact => Ok(Matcher::Exact(record.pattern.clone())),
            PatternKind::Regex => {
                // Anchor so the pattern must cover the whole job ID
                let anchored = format!("^(?:{})$", record.pattern);
                let regex = Regex::new(&anchored).map_err(|e| StorageError::InvalidPattern {
                    pattern: record.pattern.clone(),
                    reason: e.to_string(),
                })?;
                Ok(Matcher::Regex(regex))
            }
        }
    }

    fn matches(&self, job_id: &str) -> bool {
        match self {
            Matcher::Exact(p) => p == job_id,
            Matcher::Regex(r) => r.is_match(job_id),
        }
    }
}

/// Admission filter over persisted disable patterns.
///
/// Patterns live in the history database; an in-memory compiled cache is
/// refreshed on every mutation, so `is_disabled` never touches the store.
pub struct DisabledRegistry {
    store: Arc<HistoryStore>,
    cache: RwLock<Vec<Matcher>>,
}

impl DisabledRegistry {
    /// Load the registry from the store, compiling all patterns.
    pub fn load(store: Arc<HistoryStore>) -> Result<Self, StorageError> {
        let registry = Self {
            store,
            cache: RwLock::new(Vec::new()),
        };
        registry.refresh()?;
        Ok(registry)
    }

    /// Add patterns of the given kind. Returns the records actually added
    /// (already-present patterns are skipped).
    pub fn disable(
        &self,
        patterns: &[String],
        kind: PatternKind,
        at: u64,
        by: &str,
    ) -> Result<Vec<DisabledRecord>, StorageError> {
        let mut added = Vec::new();
        for pattern in patterns {
            let record = DisabledRecord {
                pattern: pattern.clone(),
                kind,
                disabled_at: at,
                disabled_by: by.to_string(),
            };
            // Validate before persisting so a bad regex never lands in the table
            Matcher::compile(&record)?;
            if self.store.insert_disabled(&record)? {
                added.push(record);
            }
        }
        self.refresh()?;
        Ok(added)
    }

    /// Remove patterns. Returns how many were present and removed.
    pub fn enable(&self, patterns: &[String]) -> Result<usize, StorageError> {
        let mut removed = 0;
        for pattern in patterns {
            if self.store.delete_disabled(pattern)? {
                removed += 1;
            }
        }
        self.refresh()?;
        Ok(removed)
    }

    /// All disable records, oldest first.
    pub fn list(&self) -> Result<Vec<DisabledRecord>, StorageError> {
        self.store.list_disabled()
    }

    /// Whether a job ID matches any disabled pattern.
    pub fn is_disabled(&self, job_id: &JobId) -> bool {
        self.cache
            .read()
            .iter()
            .any(|m| m.matches(job_id.as_str()))
    }

    fn refresh(&self) -> Result<(), StorageError> {
        let records = self.store.list_disabled()?;
        let mut matchers = Vec::with_capacity(records.len());
        for record in &records {
            match Matcher::compile(record) {
                Ok(m) => matchers.push(m),
                // A pattern that no longer compiles must not wedge admission
                Err(e) => tracing::warn!(pattern = %record.pattern, error = %e, "skipping disabled pattern"),
            }
        }
        *self.cache.write() = matchers;
        Ok(())
    }
}

#[cfg(test)]
#[path = "disabled_tests.rs"]
mod tests;
