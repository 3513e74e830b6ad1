// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Readers-writer lock protocols over a shared coordination store
//!
//! Many readers or one writer, across processes. Writers announce themselves
//! with an intent flag before competing for the mutex, so a steady stream of
//! readers cannot starve them.

mod error;
mod guard;
mod locker;
mod poll;
mod reader;
mod renew;
mod writer;

pub use error::{LockError, ScopedError};
pub use guard::{ReadGuard, WriteGuard};
pub use locker::Locker;
