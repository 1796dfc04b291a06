//! Poll a function until its output satisfies a stop condition or a
//! deadline passes.
//!
//! Each run owns a fresh [`Alarm`] armed with the timeout. Between attempts
//! the monitor waits on that alarm for the poll interval, so the last wait
//! is cut short the moment the deadline passes and the function gets one
//! final call at expiry:
//!
//! ```text
//!  call ─► check ──true──────────────────────────────► re-check ─► Ok(value)
//!            │                                            ▲
//!          false ─► fired? ──yes──────────────────────────┤
//!            ▲        │                                   ▼
//!            │        no ─► wait(interval) ─┐      on_timeout() ─► Err(Timeout)
//!            └──────────────── call ◄───────┘
//! ```
//!
//! The stop condition is checked once per call and once more on the final
//! value, so a run that makes N calls evaluates it N + 1 times.

use std::time::Duration;

use crate::alarm::{Alarm, AlarmError};
use crate::config::{ConfigError, MonitorConfig};
use crate::tracing::prelude::*;

/// Callback invoked once when a run times out.
pub type OnTimeout = Box<dyn FnOnce() + Send>;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Stop condition not met within {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Alarm misuse: {0}")]
    Alarm(#[from] AlarmError),

    #[error("Invalid monitor configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The polling loop only exits on success or expiry, so this is never
    /// returned.
    #[error("Polling stopped without timing out or meeting the stop condition")]
    NeitherTimeoutNorStopCondition,
}

impl MonitorError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, MonitorError::Timeout { .. })
    }
}

/// A configured polling run.
///
/// ```no_run
/// # use std::time::Duration;
/// # use function_output_monitor::{Monitor, MonitorConfig};
/// # async fn demo() -> Result<(), function_output_monitor::MonitorError> {
/// let config = MonitorConfig::new(Duration::from_millis(100), Duration::from_secs(5));
/// let mut polls = 0;
/// let value = Monitor::new(config)
///     .on_timeout(|| eprintln!("gave up"))
///     .run(|| { polls += 1; polls }, |n| *n >= 3)
///     .await?;
/// assert_eq!(value, 3);
/// # Ok(())
/// # }
/// ```
pub struct Monitor {
    config: MonitorConfig,
    on_timeout: Option<OnTimeout>,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            on_timeout: None,
        }
    }

    /// Run `callback` once, right before a run fails with
    /// [`MonitorError::Timeout`]. Never called on success.
    pub fn on_timeout(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_timeout = Some(Box::new(callback));
        self
    }

    /// Call `target` until `stop_condition` accepts its output or the
    /// timeout elapses.
    ///
    /// Returns the accepted value. The configuration is validated before
    /// `target` is called for the first time.
    pub async fn run<T, F, P>(self, mut target: F, mut stop_condition: P) -> Result<T, MonitorError>
    where
        F: FnMut() -> T,
        P: FnMut(&T) -> bool,
    {
        self.config.validate()?;

        let mut alarm = Alarm::new(self.config.timeout);
        alarm.start()?;

        let mut attempts: u64 = 0;
        let value = loop {
            let value = target();
            attempts += 1;

            if stop_condition(&value) || alarm.is_fired() {
                break value;
            }

            trace!(attempt = attempts, "Stop condition not met, waiting");
            alarm.wait(self.config.interval).await?;
        };

        // Re-check the last value: it may have been produced right at
        // expiry.
        if stop_condition(&value) {
            alarm.reset()?;
            debug!(attempts, "Stop condition met");
            return Ok(value);
        }

        if alarm.is_fired() {
            warn!(
                attempts,
                timeout = ?self.config.timeout,
                "Timed out waiting for stop condition"
            );
            if let Some(on_timeout) = self.on_timeout {
                on_timeout();
            }
            return Err(MonitorError::Timeout {
                timeout: self.config.timeout,
            });
        }

        error!(attempts, "Polling loop exited without success or expiry");
        Err(MonitorError::NeitherTimeoutNorStopCondition)
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("config", &self.config)
            .field("on_timeout", &self.on_timeout.is_some())
            .finish()
    }
}

/// Call `target` every `interval` until `stop_condition` accepts its output,
/// giving up after `timeout`.
///
/// On timeout `on_timeout` runs (if given) and then
/// [`MonitorError::Timeout`] is returned.
pub async fn monitor_function_output<T, F, P>(
    target: F,
    stop_condition: P,
    interval: Duration,
    timeout: Duration,
    on_timeout: Option<OnTimeout>,
) -> Result<T, MonitorError>
where
    F: FnMut() -> T,
    P: FnMut(&T) -> bool,
{
    let mut monitor = Monitor::new(MonitorConfig::new(interval, timeout));
    monitor.on_timeout = on_timeout;
    monitor.run(target, stop_condition).await
}
