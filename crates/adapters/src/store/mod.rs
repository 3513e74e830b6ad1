// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination store adapters
//!
//! The lock protocols touch the shared store only through [`CoordinationStore`].
//! Adapters never retry; every failure is returned to the protocol layer.

mod redis;

pub use self::redis::RedisStore;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeStore, StoreCall, StoreOp};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),
    #[error("store command failed: {0}")]
    CommandFailed(String),
    #[error("unexpected reply for {key}: {reply}")]
    UnexpectedReply { key: String, reply: String },
}

/// Atomic primitives of a shared key-value store with key expiration
#[async_trait]
pub trait CoordinationStore: Clone + Send + Sync + 'static {
    /// Atomically add `delta` to an integer key (missing keys start at 0)
    /// and return the new value
    async fn increment(&self, key: &str, delta: i64) -> Result<i64, StoreError>;

    /// Set `key` only if it is absent or expired. Returns whether it was set.
    async fn try_set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Unconditionally set `key` with a TTL
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Delete `key`. Returns whether a key was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically delete `key` if it currently holds `value`
    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// Atomically reset the TTL of `key` if it currently holds `value`
    async fn expire_if_equals(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;
}

/// Millisecond TTL as sent to the store; never zero
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}
