// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock configuration
//!
//! The tunables that govern liveness of both protocols. Durations are written
//! in humantime form (`"10ms"`, `"5s"`) when loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_ACQUISITION_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_KEY_EXPIRY: Duration = Duration::from_secs(5);

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid lock keys: {0}")]
    InvalidKeys(String),
}

/// Lock configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// How long a blocked acquisition sleeps before polling the store again
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,
    /// Maximum time one acquisition may wait before giving up
    #[serde(with = "humantime_serde")]
    pub acquisition_timeout: Duration,
    /// TTL applied to the mutex and writer-intent keys
    #[serde(with = "humantime_serde")]
    pub key_expiry: Duration,
    /// How often a writer extends its key TTLs while working.
    /// Derived from `key_expiry` when unset.
    #[serde(with = "humantime_serde")]
    pub renew_interval: Option<Duration>,
    pub lease_renewal: bool,
    /// Re-read the intent flag after a reader registers and back out if a
    /// writer slipped in between the check and the increment
    pub recheck_intent_after_register: bool,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            acquisition_timeout: DEFAULT_ACQUISITION_TIMEOUT,
            key_expiry: DEFAULT_KEY_EXPIRY,
            renew_interval: None,
            lease_renewal: true,
            recheck_intent_after_register: true,
        }
    }
}

impl LockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_acquisition_timeout(mut self, timeout: Duration) -> Self {
        self.acquisition_timeout = timeout;
        self
    }

    pub fn with_key_expiry(mut self, expiry: Duration) -> Self {
        self.key_expiry = expiry;
        self
    }

    pub fn with_renew_interval(mut self, interval: Duration) -> Self {
        self.renew_interval = Some(interval);
        self
    }

    pub fn with_lease_renewal(mut self, enabled: bool) -> Self {
        self.lease_renewal = enabled;
        self
    }

    pub fn with_recheck_intent(mut self, enabled: bool) -> Self {
        self.recheck_intent_after_register = enabled;
        self
    }

    /// Parse a TOML document; missing fields take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: LockConfig = toml::from_str(content)?;
        Ok(config.normalized())
    }

    /// Load a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Replace zero or out-of-range values with working defaults
    pub fn normalized(mut self) -> Self {
        if self.retry_interval.is_zero() {
            tracing::warn!("retry_interval is zero, using default");
            self.retry_interval = DEFAULT_RETRY_INTERVAL;
        }
        if self.acquisition_timeout.is_zero() {
            tracing::warn!("acquisition_timeout is zero, using default");
            self.acquisition_timeout = DEFAULT_ACQUISITION_TIMEOUT;
        }
        if self.key_expiry.is_zero() {
            tracing::warn!("key_expiry is zero, using default");
            self.key_expiry = DEFAULT_KEY_EXPIRY;
        }
        if let Some(interval) = self.renew_interval {
            if interval.is_zero() || interval >= self.key_expiry {
                tracing::warn!(
                    renew_interval_ms = interval.as_millis() as u64,
                    key_expiry_ms = self.key_expiry.as_millis() as u64,
                    "renew_interval must be non-zero and shorter than key_expiry, deriving it"
                );
                self.renew_interval = None;
            }
        }
        self
    }

    /// Interval at which a working writer renews its keys, if renewal is on
    pub fn effective_renew_interval(&self) -> Option<Duration> {
        if !self.lease_renewal {
            return None;
        }
        Some(self.renew_interval.unwrap_or(self.key_expiry / 3))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
