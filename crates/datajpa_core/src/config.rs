//! Persistence configuration.
//!
//! Values come from defaults, from the process environment
//! (`DATAJPA_BUSY_TIMEOUT_MS`, `DATAJPA_LOG_LEVEL`) or from an injected
//! lookup for tests.

use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const BUSY_TIMEOUT_ENV: &str = "DATAJPA_BUSY_TIMEOUT_MS";
pub const LOG_LEVEL_ENV: &str = "DATAJPA_LOG_LEVEL";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// How long a statement waits on a lock held by another connection.
    pub busy_timeout_ms: u64,
    /// Log level handed to `init_logging`.
    pub log_level: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            log_level: default_log_level().to_string(),
        }
    }
}

impl PersistenceConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`; missing keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(BUSY_TIMEOUT_ENV) {
            config.busy_timeout_ms =
                raw.trim()
                    .parse()
                    .map_err(|err: std::num::ParseIntError| ConfigError::InvalidValue {
                        key: BUSY_TIMEOUT_ENV,
                        value: raw.clone(),
                        reason: err.to_string(),
                    })?;
        }

        if let Some(raw) = lookup(LOG_LEVEL_ENV) {
            let level = normalize_level(&raw).map_err(|reason| ConfigError::InvalidValue {
                key: LOG_LEVEL_ENV,
                value: raw.clone(),
                reason,
            })?;
            config.log_level = level.to_string();
        }

        Ok(config)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
