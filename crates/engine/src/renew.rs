// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Writer lease renewal
//!
//! Work that outlives `key_expiry` would otherwise let the mutex expire under
//! it. While scoped work runs, the mutex and intent TTLs are pushed out every
//! renewal interval.

use crate::error::LockError;
use crate::guard::WriteGuard;
use rwl_adapters::CoordinationStore;
use rwl_core::Clock;
use std::time::Duration;

/// Renew `guard` every `interval` until the lease is lost.
///
/// Only returns once renewal is no longer possible. Store errors are retried
/// on the next tick; the keys still have the rest of their TTL.
pub(crate) async fn keep_alive<S: CoordinationStore, C: Clock>(
    guard: &WriteGuard<S>,
    clock: &C,
    interval: Duration,
) -> LockError {
    let mut renewals: u64 = 0;
    loop {
        clock.sleep(interval).await;
        match guard.renew().await {
            Ok(()) => {
                renewals += 1;
                tracing::trace!(lock = %guard.keys(), renewals, "lease renewed");
            }
            Err(e @ LockError::LeaseLost { .. }) => {
                tracing::warn!(lock = %guard.keys(), token = guard.token(), renewals, "lease lost, renewal stopped");
                return e;
            }
            Err(e) => {
                tracing::warn!(lock = %guard.keys(), error = %e, "lease renewal failed, retrying");
            }
        }
    }
}

#[cfg(test)]
#[path = "renew_tests.rs"]
mod tests;
