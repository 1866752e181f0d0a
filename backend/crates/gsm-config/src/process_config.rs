use crate::{ConfigError, ConfigErrorResult};

use serde::Deserialize;

// Process constraints
pub const MIN_SHUTDOWN_TIMEOUT_SECS: u64 = 1;
pub const MAX_SHUTDOWN_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 60;

pub const MIN_POLL_INTERVAL_SECS: u64 = 1;
pub const MAX_POLL_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Server process supervision settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProcessConfig {
    /// How long a graceful stop may take before it is reported as timed out
    pub shutdown_timeout_secs: u64,
    /// Interval between status samples
    pub poll_interval_secs: u64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl ProcessConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.shutdown_timeout_secs < MIN_SHUTDOWN_TIMEOUT_SECS
            || self.shutdown_timeout_secs > MAX_SHUTDOWN_TIMEOUT_SECS
        {
            return Err(ConfigError::process(format!(
                "process.shutdown_timeout_secs must be {}-{}, got {}",
                MIN_SHUTDOWN_TIMEOUT_SECS, MAX_SHUTDOWN_TIMEOUT_SECS, self.shutdown_timeout_secs
            )));
        }

        if self.poll_interval_secs < MIN_POLL_INTERVAL_SECS
            || self.poll_interval_secs > MAX_POLL_INTERVAL_SECS
        {
            return Err(ConfigError::process(format!(
                "process.poll_interval_secs must be {}-{}, got {}",
                MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS, self.poll_interval_secs
            )));
        }

        Ok(())
    }
}
