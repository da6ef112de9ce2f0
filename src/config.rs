//! Engine tuning configuration via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::poll::PollSchedule;
use crate::retry::RetryPolicy;

/// Reconciliation engine tuning derived from environment variables,
/// configuration files, and CLI flags.
///
/// Intervals and timeouts are expressed in milliseconds so they can be set
/// from flat configuration sources. The defaults match the behaviour of the
/// provider call sites this engine generalises: a two-minute retry budget
/// per remote call, three-minute create/delete convergence deadlines, and
/// ten-minute read/update deadlines.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "ZHODA")]
pub struct EngineConfig {
    /// Delay in milliseconds before the first retry of a remote call.
    #[ortho_config(default = 500)]
    pub retry_initial_interval_ms: u64,
    /// Backoff factor applied to the retry delay after each attempt.
    #[ortho_config(default = 2)]
    pub retry_multiplier: u32,
    /// Cap in milliseconds on the delay between retries.
    #[ortho_config(default = 30_000)]
    pub retry_max_interval_ms: u64,
    /// Retry budget in milliseconds for a single remote call.
    #[ortho_config(default = 120_000)]
    pub retry_max_elapsed_ms: u64,
    /// First convergence poll interval in milliseconds.
    #[ortho_config(default = 1_000)]
    pub poll_initial_interval_ms: u64,
    /// Cap in milliseconds on the adaptive poll interval.
    #[ortho_config(default = 15_000)]
    pub poll_max_interval_ms: u64,
    /// Deadline in milliseconds for create-time convergence.
    #[ortho_config(default = 180_000)]
    pub create_timeout_ms: u64,
    /// Deadline in milliseconds for read operations.
    #[ortho_config(default = 600_000)]
    pub read_timeout_ms: u64,
    /// Deadline in milliseconds for update operations.
    #[ortho_config(default = 600_000)]
    pub update_timeout_ms: u64,
    /// Deadline in milliseconds for deletion convergence.
    #[ortho_config(default = 180_000)]
    pub delete_timeout_ms: u64,
    /// Tag-key prefix owned by the remote system; keys under it are never
    /// deleted by tag reconciliation.
    #[ortho_config(default = "sys:".to_owned())]
    pub reserved_tag_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry_initial_interval_ms: 500,
            retry_multiplier: 2,
            retry_max_interval_ms: 30_000,
            retry_max_elapsed_ms: 120_000,
            poll_initial_interval_ms: 1_000,
            poll_max_interval_ms: 15_000,
            create_timeout_ms: 180_000,
            read_timeout_ms: 600_000,
            update_timeout_ms: 600_000,
            delete_timeout_ms: 180_000,
            reserved_tag_prefix: String::from("sys:"),
        }
    }
}

impl EngineConfig {
    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags
    /// in that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("zhoda")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on the tuning values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an interval is zero, a cap is
    /// below its initial value, or the reserved tag prefix is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_initial_interval_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "retry_initial_interval_ms must be greater than zero",
            )));
        }
        if self.retry_multiplier == 0 {
            return Err(ConfigError::Invalid(String::from(
                "retry_multiplier must be at least 1",
            )));
        }
        if self.retry_max_interval_ms < self.retry_initial_interval_ms {
            return Err(ConfigError::Invalid(String::from(
                "retry_max_interval_ms must not be below retry_initial_interval_ms",
            )));
        }
        if self.poll_initial_interval_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "poll_initial_interval_ms must be greater than zero",
            )));
        }
        if self.poll_max_interval_ms < self.poll_initial_interval_ms {
            return Err(ConfigError::Invalid(String::from(
                "poll_max_interval_ms must not be below poll_initial_interval_ms",
            )));
        }
        if self.reserved_tag_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(String::from(
                "reserved_tag_prefix must not be blank",
            )));
        }
        Ok(())
    }

    /// Retry policy applied to every remote call.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_interval: Duration::from_millis(self.retry_initial_interval_ms),
            multiplier: self.retry_multiplier,
            max_interval: Duration::from_millis(self.retry_max_interval_ms),
            max_elapsed: Duration::from_millis(self.retry_max_elapsed_ms),
        }
    }

    /// Poll schedule for a convergence wait bounded by `timeout`.
    #[must_use]
    pub fn poll_schedule(&self, timeout: Duration) -> PollSchedule {
        PollSchedule {
            initial_interval: Duration::from_millis(self.poll_initial_interval_ms),
            max_interval: Duration::from_millis(self.poll_max_interval_ms),
            timeout,
        }
    }

    /// Deadline for create-time convergence.
    #[must_use]
    pub const fn create_timeout(&self) -> Duration {
        Duration::from_millis(self.create_timeout_ms)
    }

    /// Deadline for read operations.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Deadline for update operations.
    #[must_use]
    pub const fn update_timeout(&self) -> Duration {
        Duration::from_millis(self.update_timeout_ms)
    }

    /// Deadline for deletion convergence.
    #[must_use]
    pub const fn delete_timeout(&self) -> Duration {
        Duration::from_millis(self.delete_timeout_ms)
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Eq, Error, PartialEq)]
pub enum ConfigError {
    /// Indicates a configuration value fails semantic validation.
    #[error("invalid configuration value: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
