// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol phases
//!
//! Readers move `Idle -> WaitingForWriterClear -> Registered -> Idle`.
//! Writers move `Idle -> IntentSet -> HoldingMutex -> DrainingReaders -> Exclusive -> Idle`.
//! Both cycles are linear, so `next()` is the only transition.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReaderPhase {
    Idle,
    WaitingForWriterClear,
    Registered,
}

impl ReaderPhase {
    pub fn next(self) -> Self {
        match self {
            ReaderPhase::Idle => ReaderPhase::WaitingForWriterClear,
            ReaderPhase::WaitingForWriterClear => ReaderPhase::Registered,
            ReaderPhase::Registered => ReaderPhase::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReaderPhase::Idle => "idle",
            ReaderPhase::WaitingForWriterClear => "waiting_for_writer_clear",
            ReaderPhase::Registered => "registered",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriterPhase {
    Idle,
    IntentSet,
    HoldingMutex,
    DrainingReaders,
    Exclusive,
}

impl WriterPhase {
    pub fn next(self) -> Self {
        match self {
            WriterPhase::Idle => WriterPhase::IntentSet,
            WriterPhase::IntentSet => WriterPhase::HoldingMutex,
            WriterPhase::HoldingMutex => WriterPhase::DrainingReaders,
            WriterPhase::DrainingReaders => WriterPhase::Exclusive,
            WriterPhase::Exclusive => WriterPhase::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WriterPhase::Idle => "idle",
            WriterPhase::IntentSet => "intent_set",
            WriterPhase::HoldingMutex => "holding_mutex",
            WriterPhase::DrainingReaders => "draining_readers",
            WriterPhase::Exclusive => "exclusive",
        }
    }

    /// Whether the attempt owns the mutex key in this phase
    pub fn holds_mutex(&self) -> bool {
        matches!(
            self,
            WriterPhase::HoldingMutex | WriterPhase::DrainingReaders | WriterPhase::Exclusive
        )
    }
}

/// A phase of either protocol, used in timeout reports and log fields
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Reader(ReaderPhase),
    Writer(WriterPhase),
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Reader(p) => write!(f, "reader:{}", p.as_str()),
            Phase::Writer(p) => write!(f, "writer:{}", p.as_str()),
        }
    }
}

impl From<ReaderPhase> for Phase {
    fn from(phase: ReaderPhase) -> Self {
        Phase::Reader(phase)
    }
}

impl From<WriterPhase> for Phase {
    fn from(phase: WriterPhase) -> Self {
        Phase::Writer(phase)
    }
}

#[cfg(test)]
#[path = "phase_tests.rs"]
mod tests;
