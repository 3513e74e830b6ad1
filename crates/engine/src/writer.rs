// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Writer protocol
//!
//! `Idle -> IntentSet -> HoldingMutex -> DrainingReaders -> Exclusive -> Idle`
//!
//! The writer raises the intent flag first so new readers stay out, wins the
//! mutex against other writers, then waits for already-registered readers to
//! leave. Both keys carry the attempt's owner token and are only ever removed
//! by compare-and-delete, so a writer never clears a flag another writer set.
//!
//! Ownership of the intent flag is loose: waiting writers overwrite it with
//! their own token on every poll, and the holder re-asserts it while working.
//! What matters is that it is present whenever some writer is past `IntentSet`.

use crate::error::LockError;
use crate::poll::{wait_until, Deadline};
use rwl_adapters::{CoordinationStore, StoreError};
use rwl_core::{Clock, LockConfig, LockKeys, WriterPhase};
use std::time::Duration;

/// Block until exclusive or the acquisition times out.
///
/// On any failure every key this attempt set is rolled back before returning.
pub(crate) async fn acquire<S: CoordinationStore, C: Clock>(
    store: &S,
    keys: &LockKeys,
    config: &LockConfig,
    clock: &C,
    token: &str,
) -> Result<(), LockError> {
    let deadline = Deadline::new(clock, config.acquisition_timeout);
    let mut phase = WriterPhase::Idle;

    match run(store, keys, config, &deadline, token, &mut phase).await {
        Ok(()) => {
            tracing::debug!(
                lock = %keys,
                token,
                waited_ms = deadline.elapsed().as_millis() as u64,
                "writer exclusive"
            );
            Ok(())
        }
        Err(e) => {
            tracing::debug!(lock = %keys, token, phase = phase.as_str(), error = %e, "writer acquisition failed");
            rollback(store, keys, config, token, phase).await;
            Err(e)
        }
    }
}

async fn run<S: CoordinationStore, C: Clock>(
    store: &S,
    keys: &LockKeys,
    config: &LockConfig,
    deadline: &Deadline<'_, C>,
    token: &str,
    phase: &mut WriterPhase,
) -> Result<(), LockError> {
    let expiry = config.key_expiry;

    store
        .set_with_expiry(&keys.writer_intent, token, expiry)
        .await?;
    *phase = phase.next();

    wait_until(deadline, config.retry_interval, *phase, move || async move {
        if store.try_set_with_expiry(&keys.mutex, token, expiry).await? {
            return Ok(Some(()));
        }
        // The holder's release may have removed the flag; keep ours visible
        store
            .set_with_expiry(&keys.writer_intent, token, expiry)
            .await?;
        Ok::<_, LockError>(None)
    })
    .await?;
    *phase = phase.next();
    tracing::debug!(lock = %keys, token, "writer holds mutex");

    *phase = phase.next();
    wait_until(deadline, config.retry_interval, *phase, move || async move {
        // Re-assert before reading, so the flag is set by the time a zero is seen
        refresh(store, keys, token, expiry).await?;
        match reader_count(store, keys).await? {
            0 => Ok(Some(())),
            n if n < 0 => Err(LockError::ConsistencyViolation {
                key: keys.reader_count.clone(),
                detail: format!("reader count is {} while draining", n),
            }),
            _ => Ok::<_, LockError>(None),
        }
    })
    .await?;
    *phase = phase.next();
    Ok(())
}

/// Single non-blocking attempt. Returns whether the writer became exclusive;
/// when it did not, nothing it set is left behind.
pub(crate) async fn try_acquire<S: CoordinationStore>(
    store: &S,
    keys: &LockKeys,
    config: &LockConfig,
    token: &str,
) -> Result<bool, LockError> {
    let expiry = config.key_expiry;
    let mut phase = WriterPhase::Idle;

    let attempt = async {
        store
            .set_with_expiry(&keys.writer_intent, token, expiry)
            .await?;
        phase = phase.next();
        if !store.try_set_with_expiry(&keys.mutex, token, expiry).await? {
            return Ok(false);
        }
        phase = WriterPhase::DrainingReaders;
        if reader_count(store, keys).await? != 0 {
            return Ok(false);
        }
        phase = WriterPhase::Exclusive;
        Ok::<_, LockError>(true)
    }
    .await;

    match attempt {
        Ok(true) => Ok(true),
        Ok(false) => {
            rollback(store, keys, config, token, phase).await;
            Ok(false)
        }
        Err(e) => {
            rollback(store, keys, config, token, phase).await;
            Err(e)
        }
    }
}

/// Release the mutex, then the intent flag. Both steps always run.
///
/// Finding the mutex no longer ours means it expired while held, which is
/// reported as `LeaseLost`. The intent flag may legitimately belong to a
/// waiting writer by now, so not finding our token there is fine.
pub(crate) async fn release<S: CoordinationStore>(
    store: &S,
    keys: &LockKeys,
    token: &str,
) -> Result<(), LockError> {
    let mut errors = Vec::new();

    match store.delete_if_equals(&keys.mutex, token).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(lock = %keys, token, "mutex expired or changed owner while held");
            errors.push(LockError::LeaseLost {
                key: keys.mutex.clone(),
            });
        }
        Err(e) => errors.push(e.into()),
    }
    if let Err(e) = store.delete_if_equals(&keys.writer_intent, token).await {
        errors.push(e.into());
    }

    if errors.is_empty() {
        tracing::debug!(lock = %keys, token, "writer released");
    }
    LockError::collect(errors)
}

/// Extend the mutex TTL and re-assert the intent flag
pub(crate) async fn refresh<S: CoordinationStore>(
    store: &S,
    keys: &LockKeys,
    token: &str,
    expiry: Duration,
) -> Result<(), LockError> {
    if !store.expire_if_equals(&keys.mutex, token, expiry).await? {
        return Err(LockError::LeaseLost {
            key: keys.mutex.clone(),
        });
    }
    store
        .set_with_expiry(&keys.writer_intent, token, expiry)
        .await?;
    Ok(())
}

/// Current reader count; a missing key means no readers
pub(crate) async fn reader_count<S: CoordinationStore>(
    store: &S,
    keys: &LockKeys,
) -> Result<i64, LockError> {
    match store.get(&keys.reader_count).await? {
        None => Ok(0),
        Some(raw) => raw.parse().map_err(|_| {
            LockError::Coordination(StoreError::UnexpectedReply {
                key: keys.reader_count.clone(),
                reply: raw.clone(),
            })
        }),
    }
}

/// Undo a failed or abandoned acquisition that reached `phase`.
///
/// Errors are logged rather than returned; the caller reports the failure that
/// caused the rollback, and anything left behind expires with its TTL.
async fn rollback<S: CoordinationStore>(
    store: &S,
    keys: &LockKeys,
    config: &LockConfig,
    token: &str,
    phase: WriterPhase,
) {
    if phase.holds_mutex() {
        if let Err(e) = release(store, keys, token).await {
            tracing::error!(lock = %keys, token, error = %e, "rollback release failed");
        }
        return;
    }
    if phase != WriterPhase::IntentSet {
        return;
    }

    // Another writer holding the mutex relies on the flag staying up until it
    // releases; hand it over under the holder's token instead of deleting it
    let result = match store.get(&keys.mutex).await {
        Ok(Some(holder)) => hand_off_intent(store, keys, config, &holder).await,
        Ok(None) => store.delete_if_equals(&keys.writer_intent, token).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::error!(lock = %keys, token, error = %e, "rollback of intent flag failed, leaving it to expire");
    }
}

/// Re-set the intent flag under `holder`'s token.
///
/// If the holder released between reading the mutex and setting the flag, its
/// release found nothing to delete; take the flag back down so readers are not
/// shut out until it expires. A release after the re-read removes it itself.
async fn hand_off_intent<S: CoordinationStore>(
    store: &S,
    keys: &LockKeys,
    config: &LockConfig,
    holder: &str,
) -> Result<bool, StoreError> {
    tracing::debug!(lock = %keys, holder, "handing intent flag to mutex holder");
    store
        .set_with_expiry(&keys.writer_intent, holder, config.key_expiry)
        .await?;
    if store.get(&keys.mutex).await?.as_deref() == Some(holder) {
        return Ok(true);
    }
    tracing::debug!(lock = %keys, holder, "mutex holder left during handoff, clearing intent");
    store.delete_if_equals(&keys.writer_intent, holder).await
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
