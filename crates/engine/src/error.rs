// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for lock acquisition, release and scoped execution

use rwl_adapters::StoreError;
use rwl_core::Phase;
use std::time::Duration;
use thiserror::Error;

/// Errors from the reader and writer protocols
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The store could not be reached or rejected a command. Retryable.
    #[error("coordination store error: {0}")]
    Coordination(#[from] StoreError),
    /// Acquisition did not complete within the configured timeout
    #[error("timed out after {waited:?} in {phase}")]
    Timeout { phase: Phase, waited: Duration },
    /// Shared state breaks a protocol invariant (bug or external tampering)
    #[error("consistency violation on {key}: {detail}")]
    ConsistencyViolation { key: String, detail: String },
    /// A writer's mutex key expired or changed owner while it was held
    #[error("lease lost on {key}: expired or taken over while held")]
    LeaseLost { key: String },
    /// More than one cleanup step failed
    #[error("cleanup failed: {}", join(.0))]
    Cleanup(Vec<LockError>),
}

fn join(errors: &[LockError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl LockError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, LockError::Timeout { .. })
    }

    /// Whether retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LockError::Coordination(_) | LockError::Timeout { .. } => true,
            LockError::ConsistencyViolation { .. } | LockError::LeaseLost { .. } => false,
            LockError::Cleanup(errors) => errors.iter().all(LockError::is_retryable),
        }
    }

    /// Fold the outcomes of independent cleanup steps into one result
    pub(crate) fn collect(errors: Vec<LockError>) -> Result<(), LockError> {
        let mut errors = errors;
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(LockError::Cleanup(errors)),
        }
    }
}

/// Outcome of running caller work under a lock
///
/// The work's own error is carried unchanged. A release failure never hides it.
#[derive(Debug, Error)]
pub enum ScopedError<E> {
    /// The lock was not acquired and the work did not run
    #[error("lock acquisition failed: {0}")]
    Acquire(#[source] LockError),
    /// The work failed; the lock was released cleanly
    #[error("work failed: {0}")]
    Work(E),
    /// The work succeeded but releasing the lock failed
    #[error("lock release failed: {0}")]
    Release(#[source] LockError),
    /// The work failed and releasing the lock failed too
    #[error("work failed: {work}; lock release also failed: {release}")]
    WorkAndRelease { work: E, release: LockError },
}

impl<E> ScopedError<E> {
    /// Combine the work's result with the release outcome
    pub(crate) fn settle<T>(output: Result<T, E>, released: Result<(), LockError>) -> Result<T, Self> {
        match (output, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(work), Ok(())) => Err(ScopedError::Work(work)),
            (Ok(_), Err(release)) => Err(ScopedError::Release(release)),
            (Err(work), Err(release)) => Err(ScopedError::WorkAndRelease { work, release }),
        }
    }

    pub fn work_error(&self) -> Option<&E> {
        match self {
            ScopedError::Work(work) | ScopedError::WorkAndRelease { work, .. } => Some(work),
            _ => None,
        }
    }

    pub fn into_work_error(self) -> Option<E> {
        match self {
            ScopedError::Work(work) | ScopedError::WorkAndRelease { work, .. } => Some(work),
            _ => None,
        }
    }

    /// The lock-side failure, from either acquisition or release
    pub fn lock_error(&self) -> Option<&LockError> {
        match self {
            ScopedError::Acquire(e)
            | ScopedError::Release(e)
            | ScopedError::WorkAndRelease { release: e, .. } => Some(e),
            ScopedError::Work(_) => None,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
