// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owner token generation
//!
//! Each writer acquisition writes a fresh token into the mutex and intent keys,
//! so that release and renewal only ever touch keys the same attempt created.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generates unique owner tokens
pub trait IdGen: Clone + Send + Sync + 'static {
    fn next(&self) -> String;
}

/// UUID-based token generator for production use
///
/// An optional prefix (e.g. a host or service name) makes tokens found in the
/// store traceable back to the process that wrote them.
#[derive(Clone, Debug, Default)]
pub struct UuidIdGen {
    prefix: Option<String>,
}

impl UuidIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        let id = uuid::Uuid::new_v4();
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, id),
            None => id.to_string(),
        }
    }
}

/// Sequential token generator for testing
#[derive(Clone, Debug)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("owner")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
