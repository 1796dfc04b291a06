//! Polling parameters for a [`Monitor`](crate::Monitor) run.

use std::time::Duration;

/// Rejected monitor parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Poll interval must be greater than zero")]
    ZeroInterval,

    #[error("Timeout must be greater than zero")]
    ZeroTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Pause between successive calls of the monitored function. The pause
    /// is cut short when the deadline passes.
    pub interval: Duration,

    /// Total time allowed, measured from the first call, before the
    /// monitor gives up.
    pub timeout: Duration,
}

impl MonitorConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Check that both durations are non-zero.
    ///
    /// A zero interval would spin on the monitored function and a zero
    /// timeout leaves no window to poll in.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}
