//! Dispatcher configuration loaded from environment variables.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PUBLISH_CAPACITY: usize = 10;
pub const DEFAULT_REGISTER_CAPACITY: usize = 1;

pub const PUBLISH_CAPACITY_VAR: &str = "COURIER_PUBLISH_CAPACITY";
pub const REGISTER_CAPACITY_VAR: &str = "COURIER_REGISTER_CAPACITY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidCapacity { var: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),
}

/// Sizes of the two intake queues.
///
/// A full publish queue makes `publish` wait; that is the only back-pressure
/// producers ever see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub publish_capacity: usize,
    pub register_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            publish_capacity: DEFAULT_PUBLISH_CAPACITY,
            register_capacity: DEFAULT_REGISTER_CAPACITY,
        }
    }
}

impl DispatcherConfig {
    /// Missing variables fall back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self {
            publish_capacity: capacity(&lookup, PUBLISH_CAPACITY_VAR, DEFAULT_PUBLISH_CAPACITY)?,
            register_capacity: capacity(&lookup, REGISTER_CAPACITY_VAR, DEFAULT_REGISTER_CAPACITY)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.publish_capacity == 0 {
            return Err(ConfigError::ZeroCapacity(PUBLISH_CAPACITY_VAR));
        }
        if self.register_capacity == 0 {
            return Err(ConfigError::ZeroCapacity(REGISTER_CAPACITY_VAR));
        }
        Ok(())
    }
}

fn capacity(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: usize,
) -> Result<usize, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidCapacity { var, value }),
    }
}
