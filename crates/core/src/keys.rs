// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination key names for one lock instance
//!
//! A lock instance is nothing more than three keys in the shared store:
//! - **mutex** - owner token of the writer holding exclusivity, with expiry
//! - **reader count** - number of readers inside their critical section, no expiry
//! - **writer intent** - owner token of a waiting or active writer, with expiry
//!
//! The keys are created lazily by the protocols and never explicitly destroyed.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// The three store keys shared by every participant of one lock instance
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockKeys {
    pub mutex: String,
    pub reader_count: String,
    pub writer_intent: String,
}

impl LockKeys {
    pub fn new(
        mutex: impl Into<String>,
        reader_count: impl Into<String>,
        writer_intent: impl Into<String>,
    ) -> Self {
        Self {
            mutex: mutex.into(),
            reader_count: reader_count.into(),
            writer_intent: writer_intent.into(),
        }
    }

    /// Derive all three keys from a common name prefix
    pub fn with_prefix(prefix: &str) -> Self {
        Self::new(
            format!("{}:mutex", prefix),
            format!("{}:readers", prefix),
            format!("{}:writer_intent", prefix),
        )
    }

    /// Check that the keys are non-empty and pairwise distinct
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (role, key) in self.iter() {
            if key.trim().is_empty() {
                return Err(ConfigError::InvalidKeys(format!("{} key is empty", role)));
            }
        }
        if self.mutex == self.reader_count
            || self.mutex == self.writer_intent
            || self.reader_count == self.writer_intent
        {
            return Err(ConfigError::InvalidKeys(format!(
                "keys must be distinct: mutex={}, reader_count={}, writer_intent={}",
                self.mutex, self.reader_count, self.writer_intent
            )));
        }
        Ok(())
    }

    /// Iterate over `(role, key)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("mutex", self.mutex.as_str()),
            ("reader_count", self.reader_count.as_str()),
            ("writer_intent", self.writer_intent.as_str()),
        ]
        .into_iter()
    }
}

impl std::fmt::Display for LockKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.mutex, self.reader_count, self.writer_intent
        )
    }
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
