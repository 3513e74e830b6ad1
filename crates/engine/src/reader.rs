// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reader protocol
//!
//! `Idle -> WaitingForWriterClear -> Registered -> Idle`
//!
//! A reader waits for the writer-intent flag to clear, then registers by
//! incrementing the reader count. Checking the flag and incrementing are two
//! separate store calls, so a writer can set intent in between; the optional
//! re-check after registering backs the reader out again when that happens.

use crate::error::LockError;
use crate::guard::ReadGuard;
use crate::poll::{wait_until, Deadline};
use rwl_adapters::CoordinationStore;
use rwl_core::{Clock, LockConfig, LockKeys, ReaderPhase};
use std::sync::Arc;

/// Block until registered as a reader or the acquisition times out
pub(crate) async fn acquire<S: CoordinationStore, C: Clock>(
    store: &S,
    keys: &Arc<LockKeys>,
    config: &LockConfig,
    clock: &C,
) -> Result<ReadGuard<S>, LockError> {
    let deadline = Deadline::new(clock, config.acquisition_timeout);
    let phase = ReaderPhase::Idle.next();
    tracing::debug!(lock = %keys, phase = phase.as_str(), "reader waiting");

    loop {
        wait_until(&deadline, config.retry_interval, phase, move || async move {
            intent_clear(store, keys).await.map(|clear| clear.then_some(()))
        })
        .await?;

        if let Some(guard) = register(store, keys, config).await? {
            tracing::debug!(
                lock = %keys,
                phase = phase.next().as_str(),
                waited_ms = deadline.elapsed().as_millis() as u64,
                "reader registered"
            );
            return Ok(guard);
        }

        if deadline.expired() {
            return Err(deadline.timeout_error(phase));
        }
        clock.sleep(config.retry_interval.min(deadline.remaining())).await;
    }
}

/// Single non-blocking attempt. `None` when a writer is waiting or active.
pub(crate) async fn try_acquire<S: CoordinationStore>(
    store: &S,
    keys: &Arc<LockKeys>,
    config: &LockConfig,
) -> Result<Option<ReadGuard<S>>, LockError> {
    if !intent_clear(store, keys).await? {
        return Ok(None);
    }
    register(store, keys, config).await
}

/// Leave the reader count. Exactly one call per successful registration.
pub(crate) async fn release<S: CoordinationStore>(
    store: &S,
    keys: &LockKeys,
) -> Result<(), LockError> {
    let count = store.increment(&keys.reader_count, -1).await?;
    if count >= 0 {
        tracing::debug!(lock = %keys, readers = count, "reader released");
        return Ok(());
    }

    // More releases than registrations; undo ours so the count is not left negative
    let violation = LockError::ConsistencyViolation {
        key: keys.reader_count.clone(),
        detail: format!("reader count dropped to {} on release", count),
    };
    tracing::error!(lock = %keys, readers = count, "reader count went negative, restoring");
    match store.increment(&keys.reader_count, 1).await {
        Ok(_) => Err(violation),
        Err(e) => Err(LockError::Cleanup(vec![violation, e.into()])),
    }
}

async fn intent_clear<S: CoordinationStore>(store: &S, keys: &LockKeys) -> Result<bool, LockError> {
    Ok(store.get(&keys.writer_intent).await?.is_none())
}

/// Increment the reader count, backing out if the registration is not usable.
/// Returns `Ok(None)` when a writer's intent appeared during registration.
///
/// The guard exists from the moment the increment lands, so a caller that
/// drops this future part way still gets the decrement.
async fn register<S: CoordinationStore>(
    store: &S,
    keys: &Arc<LockKeys>,
    config: &LockConfig,
) -> Result<Option<ReadGuard<S>>, LockError> {
    let count = store.increment(&keys.reader_count, 1).await?;
    let guard = ReadGuard::new(store.clone(), Arc::clone(keys));
    if count < 1 {
        let violation = LockError::ConsistencyViolation {
            key: keys.reader_count.clone(),
            detail: format!("reader count was {} before registering", count - 1),
        };
        return Err(undo_registration(guard, violation).await);
    }

    if !config.recheck_intent_after_register {
        return Ok(Some(guard));
    }
    match store.get(&keys.writer_intent).await {
        Ok(None) => Ok(Some(guard)),
        Ok(Some(owner)) => {
            tracing::debug!(lock = %keys, writer = %owner, "writer intent appeared while registering, backing out");
            guard.release().await?;
            Ok(None)
        }
        Err(e) => Err(undo_registration(guard, e.into()).await),
    }
}

/// Roll back a registration after `primary` made it unusable.
///
/// A plain decrement: a count that was already negative stays as found.
async fn undo_registration<S: CoordinationStore>(guard: ReadGuard<S>, primary: LockError) -> LockError {
    let keys = Arc::clone(guard.shared_keys());
    let Some(store) = guard.disarm() else {
        return primary;
    };
    match store.increment(&keys.reader_count, -1).await {
        Ok(_) => primary,
        Err(e) => {
            tracing::error!(lock = %keys, error = %e, "failed to roll back reader registration");
            LockError::Cleanup(vec![primary, e.into()])
        }
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
