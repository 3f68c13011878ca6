//! Configuration management for seat selection.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "seating=debug,seatlock_runtime=info";

/// Invalid configuration values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value that must be positive is zero
    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),
}

/// Seat selection configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Most seats one user may hold at once
    pub max_selection: usize,
    /// Upper bound on a lock or unlock call, in milliseconds
    pub request_timeout_ms: u64,
    /// Countdown refresh interval, in milliseconds
    pub countdown_tick_ms: u64,
    /// Countdown turns urgent at or below this many seconds
    pub expiry_warning_secs: u64,
    /// Capacity of the store's feedback broadcast
    pub broadcast_capacity: usize,
    /// `tracing` filter directive, from `RUST_LOG`
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Falls back to defaults for missing or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_selection: env::var("SEATING_MAX_SELECTION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(6),
            request_timeout_ms: env::var("SEATING_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5_000),
            countdown_tick_ms: env::var("SEATING_COUNTDOWN_TICK_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1_000),
            expiry_warning_secs: env::var("SEATING_EXPIRY_WARNING_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            broadcast_capacity: env::var("SEATING_BROADCAST_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MustBePositive`] for a zero selection limit,
    /// request timeout, countdown tick or broadcast capacity.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.max_selection == 0 {
            return Err(ConfigError::MustBePositive("max_selection"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::MustBePositive("request_timeout_ms"));
        }
        if self.countdown_tick_ms == 0 {
            return Err(ConfigError::MustBePositive("countdown_tick_ms"));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::MustBePositive("broadcast_capacity"));
        }
        Ok(())
    }

    /// Request timeout as a `Duration`
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Countdown tick as a `Duration`
    #[must_use]
    pub const fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }

    /// Urgency threshold as a `Duration`
    #[must_use]
    pub const fn expiry_warning(&self) -> Duration {
        Duration::from_secs(self.expiry_warning_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_selection: 6,
            request_timeout_ms: 5_000,
            countdown_tick_ms: 1_000,
            expiry_warning_secs: 60,
            broadcast_capacity: 64,
            log_level: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.countdown_tick(), Duration::from_secs(1));
        assert_eq!(config.log_level, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = Config {
            max_selection: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MustBePositive("max_selection")));

        let config = Config {
            countdown_tick_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MustBePositive("countdown_tick_ms")));

        let config = Config {
            broadcast_capacity: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MustBePositive("broadcast_capacity")));
    }
}
