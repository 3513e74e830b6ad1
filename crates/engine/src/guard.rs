// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Held-lock guards
//!
//! A guard is released by awaiting [`ReadGuard::release`] or
//! [`WriteGuard::release`], which reports failures. Dropping an unreleased
//! guard (early return, panic, cancelled task) spawns the release on the
//! current tokio runtime instead, where failures can only be logged.

use crate::error::LockError;
use crate::{reader, writer};
use rwl_adapters::CoordinationStore;
use rwl_core::LockKeys;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Shared access, held until released or dropped
#[must_use = "dropping the guard releases the read lock in the background"]
pub struct ReadGuard<S: CoordinationStore> {
    store: Option<S>,
    keys: Arc<LockKeys>,
}

impl<S: CoordinationStore> ReadGuard<S> {
    pub(crate) fn new(store: S, keys: Arc<LockKeys>) -> Self {
        Self {
            store: Some(store),
            keys,
        }
    }

    pub fn keys(&self) -> &LockKeys {
        &self.keys
    }

    pub(crate) fn shared_keys(&self) -> &Arc<LockKeys> {
        &self.keys
    }

    /// Take the store out without releasing; the caller owns the cleanup
    pub(crate) fn disarm(mut self) -> Option<S> {
        self.store.take()
    }

    /// Leave the reader count
    pub async fn release(mut self) -> Result<(), LockError> {
        match self.store.take() {
            Some(store) => reader::release(&store, &self.keys).await,
            None => Ok(()),
        }
    }
}

impl<S: CoordinationStore> Drop for ReadGuard<S> {
    fn drop(&mut self) {
        if let Some(store) = self.store.take() {
            let keys = Arc::clone(&self.keys);
            release_in_background("reader", &self.keys, async move {
                reader::release(&store, &keys).await
            });
        }
    }
}

impl<S: CoordinationStore> std::fmt::Debug for ReadGuard<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadGuard")
            .field("keys", &self.keys)
            .field("held", &self.store.is_some())
            .finish()
    }
}

/// Exclusive access, held until released or dropped
#[must_use = "dropping the guard releases the write lock in the background"]
pub struct WriteGuard<S: CoordinationStore> {
    store: Option<S>,
    keys: Arc<LockKeys>,
    token: String,
    key_expiry: Duration,
}

impl<S: CoordinationStore> WriteGuard<S> {
    pub(crate) fn new(store: S, keys: Arc<LockKeys>, token: String, key_expiry: Duration) -> Self {
        Self {
            store: Some(store),
            keys,
            token,
            key_expiry,
        }
    }

    pub fn keys(&self) -> &LockKeys {
        &self.keys
    }

    /// Owner token stored in the mutex key
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Push the mutex and intent expiry out by another `key_expiry`.
    ///
    /// Fails with `LeaseLost` once the mutex has expired or changed owner.
    pub async fn renew(&self) -> Result<(), LockError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        writer::refresh(store, &self.keys, &self.token, self.key_expiry).await
    }

    /// Release the mutex and the intent flag
    pub async fn release(mut self) -> Result<(), LockError> {
        match self.store.take() {
            Some(store) => writer::release(&store, &self.keys, &self.token).await,
            None => Ok(()),
        }
    }
}

impl<S: CoordinationStore> Drop for WriteGuard<S> {
    fn drop(&mut self) {
        if let Some(store) = self.store.take() {
            let keys = Arc::clone(&self.keys);
            let token = std::mem::take(&mut self.token);
            release_in_background("writer", &self.keys, async move {
                writer::release(&store, &keys, &token).await
            });
        }
    }
}

impl<S: CoordinationStore> std::fmt::Debug for WriteGuard<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteGuard")
            .field("keys", &self.keys)
            .field("token", &self.token)
            .field("held", &self.store.is_some())
            .finish()
    }
}

fn release_in_background<F>(role: &'static str, keys: &LockKeys, release: F)
where
    F: Future<Output = Result<(), LockError>> + Send + 'static,
{
    let lock = keys.to_string();
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            tracing::warn!(%lock, role, "guard dropped while held, releasing in background");
            handle.spawn(async move {
                if let Err(e) = release.await {
                    tracing::error!(%lock, role, error = %e, "background release failed");
                }
            });
        }
        Err(_) => {
            // Mutex and intent expire on their own; a reader registration does not
            tracing::error!(%lock, role, "guard dropped outside a tokio runtime, lock not released");
        }
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
