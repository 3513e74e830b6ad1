// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake coordination store for testing
#![cfg_attr(coverage_nightly, coverage(off))]
//!
//! An in-memory map whose key expiry follows an injected [`Clock`], so tests
//! can expire a crashed holder's keys by advancing a `FakeClock`. Every call
//! is recorded, and failures can be injected per operation and key.

use super::{CoordinationStore, StoreError};
use async_trait::async_trait;
use rwl_core::clock::{Clock, SystemClock};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Store operation kinds, used to target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Increment,
    TrySetWithExpiry,
    SetWithExpiry,
    Get,
    Delete,
    DeleteIfEquals,
    ExpireIfEquals,
}

/// Recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Increment {
        key: String,
        delta: i64,
    },
    TrySetWithExpiry {
        key: String,
        value: String,
        ttl: Duration,
    },
    SetWithExpiry {
        key: String,
        value: String,
        ttl: Duration,
    },
    Get {
        key: String,
    },
    Delete {
        key: String,
    },
    DeleteIfEquals {
        key: String,
        value: String,
    },
    ExpireIfEquals {
        key: String,
        value: String,
        ttl: Duration,
    },
}

impl StoreCall {
    pub fn op(&self) -> StoreOp {
        match self {
            StoreCall::Increment { .. } => StoreOp::Increment,
            StoreCall::TrySetWithExpiry { .. } => StoreOp::TrySetWithExpiry,
            StoreCall::SetWithExpiry { .. } => StoreOp::SetWithExpiry,
            StoreCall::Get { .. } => StoreOp::Get,
            StoreCall::Delete { .. } => StoreOp::Delete,
            StoreCall::DeleteIfEquals { .. } => StoreOp::DeleteIfEquals,
            StoreCall::ExpireIfEquals { .. } => StoreOp::ExpireIfEquals,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            StoreCall::Increment { key, .. }
            | StoreCall::TrySetWithExpiry { key, .. }
            | StoreCall::SetWithExpiry { key, .. }
            | StoreCall::Get { key }
            | StoreCall::Delete { key }
            | StoreCall::DeleteIfEquals { key, .. }
            | StoreCall::ExpireIfEquals { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

#[derive(Debug, Clone)]
struct Failure {
    op: StoreOp,
    key: Option<String>,
    /// Matching calls to let through before failing
    skip: u32,
    remaining: Option<u32>,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    calls: Vec<StoreCall>,
    failures: Vec<Failure>,
}

/// Fake coordination store for testing
#[derive(Clone)]
pub struct FakeStore<C: Clock = SystemClock> {
    state: Arc<Mutex<State>>,
    clock: C,
}

impl FakeStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for FakeStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> FakeStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Recorded calls of one kind
    pub fn calls_of(&self, op: StoreOp) -> Vec<StoreCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.op() == op)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Write a key directly, as another process would
    pub fn seed(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| self.clock.now() + ttl);
        self.lock().entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    /// Current value of a key, honoring expiry
    pub fn value(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let mut state = self.lock();
        live_entry(&mut state, key, now).map(|e| e.value.clone())
    }

    /// Integer value of a key, with missing keys reading as 0
    pub fn counter(&self, key: &str) -> i64 {
        self.value(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    /// Remaining TTL of a key, if it exists and has one
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let mut state = self.lock();
        live_entry(&mut state, key, now)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Fail the next call of `op`, on any key
    pub fn fail_next(&self, op: StoreOp) {
        self.fail_after(op, 0);
    }

    /// Let `skip` calls of `op` succeed, then fail the one after
    pub fn fail_after(&self, op: StoreOp, skip: u32) {
        self.lock().failures.push(Failure {
            op,
            key: None,
            skip,
            remaining: Some(1),
        });
    }

    /// Fail every call of `op` on `key` until cleared
    pub fn fail_on(&self, op: StoreOp, key: &str) {
        self.lock().failures.push(Failure {
            op,
            key: Some(key.to_string()),
            skip: 0,
            remaining: None,
        });
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Record a call and return the injected failure for it, if any
    fn record(&self, call: StoreCall) -> Result<(), StoreError> {
        let mut state = self.lock();
        let op = call.op();
        let key = call.key().to_string();
        state.calls.push(call);

        let matched = state.failures.iter().position(|f| {
            f.op == op && f.key.as_deref().map_or(true, |k| k == key)
        });
        if let Some(index) = matched {
            let failure = &mut state.failures[index];
            if failure.skip > 0 {
                failure.skip -= 1;
                return Ok(());
            }
            if let Some(remaining) = failure.remaining.as_mut() {
                *remaining -= 1;
                if *remaining == 0 {
                    state.failures.remove(index);
                }
            }
            return Err(StoreError::CommandFailed(format!(
                "injected failure: {:?} {}",
                op, key
            )));
        }
        Ok(())
    }
}

/// Look up a key, dropping it first if it has expired
fn live_entry<'a>(state: &'a mut State, key: &str, now: Instant) -> Option<&'a mut Entry> {
    let expired = state
        .entries
        .get(key)
        .and_then(|e| e.expires_at)
        .is_some_and(|at| at <= now);
    if expired {
        state.entries.remove(key);
    }
    state.entries.get_mut(key)
}

#[async_trait]
impl<C: Clock> CoordinationStore for FakeStore<C> {
    async fn increment(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        self.record(StoreCall::Increment {
            key: key.to_string(),
            delta,
        })?;

        let now = self.clock.now();
        let mut state = self.lock();
        let current = match live_entry(&mut state, key, now) {
            Some(entry) => entry.value.parse::<i64>().map_err(|_| {
                StoreError::CommandFailed(format!("value at {} is not an integer", key))
            })?,
            None => 0,
        };
        let updated = current + delta;
        // INCRBY keeps an existing TTL
        let expires_at = state.entries.get(key).and_then(|e| e.expires_at);
        state.entries.insert(
            key.to_string(),
            Entry {
                value: updated.to_string(),
                expires_at,
            },
        );
        Ok(updated)
    }

    async fn try_set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.record(StoreCall::TrySetWithExpiry {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        })?;

        let now = self.clock.now();
        let mut state = self.lock();
        if live_entry(&mut state, key, now).is_some() {
            return Ok(false);
        }
        state.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(true)
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.record(StoreCall::SetWithExpiry {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        })?;

        let now = self.clock.now();
        self.lock().entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.record(StoreCall::Get {
            key: key.to_string(),
        })?;

        let now = self.clock.now();
        let mut state = self.lock();
        Ok(live_entry(&mut state, key, now).map(|e| e.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.record(StoreCall::Delete {
            key: key.to_string(),
        })?;

        let now = self.clock.now();
        let mut state = self.lock();
        let existed = live_entry(&mut state, key, now).is_some();
        state.entries.remove(key);
        Ok(existed)
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        self.record(StoreCall::DeleteIfEquals {
            key: key.to_string(),
            value: value.to_string(),
        })?;

        let now = self.clock.now();
        let mut state = self.lock();
        let owned = live_entry(&mut state, key, now).is_some_and(|e| e.value == value);
        if owned {
            state.entries.remove(key);
        }
        Ok(owned)
    }

    async fn expire_if_equals(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.record(StoreCall::ExpireIfEquals {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        })?;

        let now = self.clock.now();
        let mut state = self.lock();
        match live_entry(&mut state, key, now) {
            Some(entry) if entry.value == value => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
