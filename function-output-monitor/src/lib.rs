//! Bounded polling: call a function until its output satisfies a stop
//! condition or a deadline passes.
//!
//! Built from two pieces. An [`Alarm`] is a resettable one-shot deadline
//! timer whose [`wait`](Alarm::wait) wakes early when the deadline fires.
//! The [`Monitor`] loop calls the target, checks its output, and sleeps on
//! the alarm between attempts.

pub mod alarm;
pub mod config;
pub mod monitor;
pub mod tracing;

pub use alarm::{Alarm, AlarmError, AlarmGuard, AlarmState};
pub use config::{ConfigError, MonitorConfig};
pub use monitor::{Monitor, MonitorError, OnTimeout, monitor_function_output};
