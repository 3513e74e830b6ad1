// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed readers-writer lock handle
//!
//! A [`Locker`] is cheap to clone; every clone refers to the same lock
//! instance, and each writer acquisition gets a fresh owner token.

use crate::error::{LockError, ScopedError};
use crate::guard::{ReadGuard, WriteGuard};
use crate::{reader, renew, writer};
use rwl_adapters::CoordinationStore;
use rwl_core::{Clock, ConfigError, IdGen, LockConfig, LockKeys, SystemClock, UuidIdGen};
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;

/// Readers-writer lock over a shared coordination store
#[derive(Clone)]
pub struct Locker<S, C = SystemClock, G = UuidIdGen>
where
    S: CoordinationStore,
    C: Clock,
    G: IdGen,
{
    store: S,
    keys: Arc<LockKeys>,
    config: Arc<LockConfig>,
    clock: C,
    id_gen: G,
}

impl<S: CoordinationStore> Locker<S> {
    /// Create a lock over `keys`, rejecting empty or overlapping key names
    pub fn new(store: S, keys: LockKeys, config: LockConfig) -> Result<Self, ConfigError> {
        keys.validate()?;
        Ok(Self {
            store,
            keys: Arc::new(keys),
            config: Arc::new(config.normalized()),
            clock: SystemClock,
            id_gen: UuidIdGen::new(),
        })
    }
}

impl<S, C, G> Locker<S, C, G>
where
    S: CoordinationStore,
    C: Clock,
    G: IdGen,
{
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Locker<S, C2, G> {
        Locker {
            store: self.store,
            keys: self.keys,
            config: self.config,
            clock,
            id_gen: self.id_gen,
        }
    }

    pub fn with_id_gen<G2: IdGen>(self, id_gen: G2) -> Locker<S, C, G2> {
        Locker {
            store: self.store,
            keys: self.keys,
            config: self.config,
            clock: self.clock,
            id_gen,
        }
    }

    pub fn keys(&self) -> &LockKeys {
        &self.keys
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Wait for shared access
    pub async fn acquire_read(&self) -> Result<ReadGuard<S>, LockError> {
        reader::acquire(&self.store, &self.keys, &self.config, &self.clock).await
    }

    /// Take shared access only if no writer is waiting or active
    pub async fn try_read(&self) -> Result<Option<ReadGuard<S>>, LockError> {
        reader::try_acquire(&self.store, &self.keys, &self.config).await
    }

    /// Wait for exclusive access
    pub async fn acquire_write(&self) -> Result<WriteGuard<S>, LockError> {
        let token = self.id_gen.next();
        writer::acquire(&self.store, &self.keys, &self.config, &self.clock, &token).await?;
        Ok(self.write_guard(token))
    }

    /// Take exclusive access only if it is free right now
    pub async fn try_write(&self) -> Result<Option<WriteGuard<S>>, LockError> {
        let token = self.id_gen.next();
        let acquired = writer::try_acquire(&self.store, &self.keys, &self.config, &token).await?;
        Ok(acquired.then(|| self.write_guard(token)))
    }

    fn write_guard(&self, token: String) -> WriteGuard<S> {
        WriteGuard::new(
            self.store.clone(),
            Arc::clone(&self.keys),
            token,
            self.config.key_expiry,
        )
    }

    /// Run `work` with shared access, releasing afterwards whatever the outcome
    pub async fn read<F, Fut, T, E>(&self, work: F) -> Result<T, ScopedError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let span = tracing::info_span!("rwlock.read", lock = %self.keys);
        async move {
            let guard = self.acquire_read().await.map_err(ScopedError::Acquire)?;
            let output = work().await;
            let released = guard.release().await;
            if let Err(e) = &released {
                tracing::warn!(error = %e, "read release failed");
            }
            ScopedError::settle(output, released)
        }
        .instrument(span)
        .await
    }

    /// Run `work` with exclusive access, releasing afterwards whatever the outcome.
    ///
    /// The lease is renewed while `work` runs. A lease lost part way through is
    /// reported as a release failure once `work` returns.
    pub async fn write<F, Fut, T, E>(&self, work: F) -> Result<T, ScopedError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let span = tracing::info_span!("rwlock.write", lock = %self.keys);
        async move {
            let guard = self.acquire_write().await.map_err(ScopedError::Acquire)?;
            let output = match self.config.effective_renew_interval() {
                Some(interval) => {
                    let work = work();
                    tokio::pin!(work);
                    let renewal = renew::keep_alive(&guard, &self.clock, interval);
                    tokio::pin!(renewal);
                    let mut renewing = true;
                    loop {
                        tokio::select! {
                            output = &mut work => break output,
                            lost = &mut renewal, if renewing => {
                                renewing = false;
                                tracing::warn!(error = %lost, "lease lost while work is running");
                            }
                        }
                    }
                }
                None => work().await,
            };
            let released = guard.release().await;
            if let Err(e) = &released {
                tracing::warn!(error = %e, "write release failed");
            }
            ScopedError::settle(output, released)
        }
        .instrument(span)
        .await
    }
}

impl<S, C, G> std::fmt::Debug for Locker<S, C, G>
where
    S: CoordinationStore,
    C: Clock,
    G: IdGen,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locker")
            .field("keys", &self.keys)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "locker_tests.rs"]
mod tests;
