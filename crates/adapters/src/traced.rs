// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use crate::store::{CoordinationStore, StoreError};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Wrapper that adds tracing to any CoordinationStore
///
/// Mutations log at debug, polling reads at trace, failures at warn.
#[derive(Clone)]
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[async_trait]
impl<S: CoordinationStore> CoordinationStore for TracedStore<S> {
    async fn increment(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let span = tracing::debug_span!("store.increment", key, delta);
        async {
            let start = Instant::now();
            let result = self.inner.increment(key, delta).await;
            match &result {
                Ok(value) => tracing::debug!(value, elapsed_ms = elapsed_ms(start), "incremented"),
                Err(e) => tracing::warn!(elapsed_ms = elapsed_ms(start), error = %e, "increment failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn try_set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let span = tracing::debug_span!(
            "store.try_set",
            key,
            value,
            ttl_ms = ttl.as_millis() as u64
        );
        async {
            let start = Instant::now();
            let result = self.inner.try_set_with_expiry(key, value, ttl).await;
            match &result {
                Ok(set) => tracing::debug!(set, elapsed_ms = elapsed_ms(start), "conditional set"),
                Err(e) => tracing::warn!(elapsed_ms = elapsed_ms(start), error = %e, "conditional set failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let span = tracing::debug_span!("store.set", key, value, ttl_ms = ttl.as_millis() as u64);
        async {
            let result = self.inner.set_with_expiry(key, value, ttl).await;
            match &result {
                Ok(()) => tracing::debug!("set"),
                Err(e) => tracing::warn!(error = %e, "set failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let result = self.inner.get(key).await;
        match &result {
            Ok(value) => tracing::trace!(key, value = ?value, "get"),
            Err(e) => tracing::warn!(key, error = %e, "get failed"),
        }
        result
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let result = self.inner.delete(key).await;
        match &result {
            Ok(removed) => tracing::debug!(key, removed, "deleted"),
            Err(e) => tracing::warn!(key, error = %e, "delete failed"),
        }
        result
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let result = self.inner.delete_if_equals(key, value).await;
        match &result {
            Ok(true) => tracing::debug!(key, value, "released"),
            // Not an error: the key expired or was taken over
            Ok(false) => tracing::debug!(key, value, "not owner, nothing released"),
            Err(e) => tracing::warn!(key, error = %e, "compare-and-delete failed"),
        }
        result
    }

    async fn expire_if_equals(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let result = self.inner.expire_if_equals(key, value, ttl).await;
        match &result {
            Ok(renewed) => tracing::trace!(key, renewed, ttl_ms = ttl.as_millis() as u64, "renew"),
            Err(e) => tracing::warn!(key, error = %e, "renew failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
