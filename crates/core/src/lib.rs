// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rwl-core: Shared building blocks for the distributed reader-writer lock
//!
//! This crate provides:
//! - Clock abstraction so polling loops can run against virtual time
//! - Owner token generation
//! - The three coordination key names of a lock instance
//! - Lock configuration (retry interval, acquisition timeout, key expiry)
//! - Reader and writer protocol phases

pub mod clock;
pub mod config;
pub mod id;
pub mod keys;
pub mod phase;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, LockConfig};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use keys::LockKeys;
pub use phase::{Phase, ReaderPhase, WriterPhase};
