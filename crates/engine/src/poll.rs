// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadline-bounded polling
//!
//! The store offers no blocking wait, so every "wait until C" is a
//! check-sleep-recheck loop against one monotonic deadline per acquisition.

use crate::error::LockError;
use rwl_core::{Clock, Phase};
use std::future::Future;
use std::time::{Duration, Instant};

/// Monotonic deadline shared by all waits of one acquisition attempt
pub(crate) struct Deadline<'a, C> {
    clock: &'a C,
    start: Instant,
    timeout: Duration,
}

impl<'a, C: Clock> Deadline<'a, C> {
    pub(crate) fn new(clock: &'a C, timeout: Duration) -> Self {
        Self {
            clock,
            start: clock.now(),
            timeout,
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.start)
    }

    pub(crate) fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.elapsed())
    }

    pub(crate) fn expired(&self) -> bool {
        self.remaining().is_zero()
    }

    pub(crate) fn timeout_error(&self, phase: impl Into<Phase>) -> LockError {
        LockError::Timeout {
            phase: phase.into(),
            waited: self.elapsed(),
        }
    }
}

/// Run `check` until it yields a value, sleeping `interval` between attempts.
///
/// `check` always runs at least once, and once more after the final sleep, so a
/// condition that clears right at the deadline is still observed.
pub(crate) async fn wait_until<C, T, F, Fut>(
    deadline: &Deadline<'_, C>,
    interval: Duration,
    phase: impl Into<Phase>,
    mut check: F,
) -> Result<T, LockError>
where
    C: Clock,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, LockError>>,
{
    let phase = phase.into();
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        if let Some(value) = check().await? {
            if attempts > 1 {
                tracing::debug!(%phase, attempts, waited_ms = deadline.elapsed().as_millis() as u64, "condition met");
            }
            return Ok(value);
        }
        if deadline.expired() {
            tracing::debug!(%phase, attempts, "deadline reached");
            return Err(deadline.timeout_error(phase));
        }
        deadline
            .clock
            .sleep(interval.min(deadline.remaining()))
            .await;
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
