//! A resettable one-shot deadline timer with an interruptible wait.
//!
//! The alarm is the sleep primitive behind the output monitor: the poller
//! waits on it between attempts, and the wait ends early the moment the
//! deadline passes.
//!
//! # State Machine
//!
//! ```text
//!            start()                 timeout elapses
//!  Idle ──────────────► Armed ──────────────────────► Expired
//!   ▲                     │                              │
//!   │  reset() / stop()   │                              │
//!   └─────────────────────┘                              │
//!   ▲                                                    │
//!   └────────────────── reset() / stop() ────────────────┘
//! ```
//!
//! - **Idle:** Never started, or reset. No background task exists.
//! - **Armed:** A timer task is scheduled and has not fired yet.
//! - **Expired:** The timer task fired. The alarm must be reset (or
//!   restarted) before it can be started again, so a stale expiry is never
//!   silently overwritten.
//!
//! Each armed period owns its own timer task and its own `watch` channel.
//! Resetting aborts the task and drops the channel, so a timer that fires
//! concurrently with a reset publishes into a channel nobody reads anymore.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::tracing::prelude::*;

/// Misuse of the alarm lifecycle. These are caller bugs, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AlarmError {
    #[error("Alarm must be started before waiting on it")]
    WaitWithoutStarting,

    #[error("Alarm is already started")]
    AlreadyStarted,

    #[error("Alarm fired and must be reset before it can be started again")]
    StartWithoutResetting,

    #[error("Alarm was reset without ever being started")]
    ResetWithoutStarting,

    #[error("Alarm was stopped without ever being started")]
    StopWithoutStarting,
}

/// Observable lifecycle state of an [`Alarm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    /// No timer is scheduled.
    Idle,

    /// Timer scheduled, deadline not reached.
    Armed,

    /// Deadline reached. Needs a reset before the next start.
    Expired,
}

/// One armed period: the timer task and the channel it fires into.
#[derive(Debug)]
struct Armed {
    timer: JoinHandle<()>,
    fired_rx: watch::Receiver<bool>,
    deadline: Instant,
}

impl Armed {
    fn is_fired(&self) -> bool {
        *self.fired_rx.borrow()
    }
}

/// A one-shot deadline timer.
///
/// [`start`](Self::start) spawns a Tokio task that sleeps for `timeout` and
/// then flips the fired flag. [`wait`](Self::wait) suspends the caller for
/// up to a given duration, returning as soon as the flag flips. Must be used
/// from within a Tokio runtime.
///
/// Dropping the alarm aborts any pending timer task.
#[derive(Debug)]
pub struct Alarm {
    timeout: Duration,
    armed: Option<Armed>,
    started_once: bool,
}

impl Alarm {
    /// Create an idle alarm that fires `timeout` after each start.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            armed: None,
            started_once: false,
        }
    }

    /// The duration between [`start`](Self::start) and firing.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AlarmState {
        match &self.armed {
            None => AlarmState::Idle,
            Some(armed) if armed.is_fired() => AlarmState::Expired,
            Some(_) => AlarmState::Armed,
        }
    }

    /// Whether the timer of the current armed period has fired.
    ///
    /// Always false while idle.
    pub fn is_fired(&self) -> bool {
        self.armed.as_ref().is_some_and(Armed::is_fired)
    }

    /// Schedule the timer. Only valid while idle.
    pub fn start(&mut self) -> Result<(), AlarmError> {
        if let Some(armed) = &self.armed {
            return Err(if armed.is_fired() {
                AlarmError::StartWithoutResetting
            } else {
                AlarmError::AlreadyStarted
            });
        }

        let deadline = deadline_after(self.timeout);
        let (fired_tx, fired_rx) = watch::channel(false);
        let timer = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            fired_tx.send_replace(true);
        });

        trace!(timeout = ?self.timeout, "Alarm armed");
        self.armed = Some(Armed {
            timer,
            fired_rx,
            deadline,
        });
        self.started_once = true;
        Ok(())
    }

    /// Suspend for up to `duration`, returning early if the alarm fires.
    ///
    /// Returns immediately if the alarm already fired. When `duration`
    /// reaches past the deadline, this returns exactly when the timer fires,
    /// so [`is_fired`](Self::is_fired) is true afterwards.
    pub async fn wait(&mut self, duration: Duration) -> Result<(), AlarmError> {
        let armed = self.armed.as_mut().ok_or(AlarmError::WaitWithoutStarting)?;
        if armed.is_fired() {
            return Ok(());
        }

        let fired_rx = &mut armed.fired_rx;
        let until = Instant::now().checked_add(duration);
        match until {
            Some(until) if until < armed.deadline => {
                tokio::select! {
                    _ = fired_rx.wait_for(|fired| *fired) => {}
                    _ = time::sleep_until(until) => {}
                }
            }
            _ => {
                // The sender only goes away with the task; in that case
                // there is nothing left to wait for.
                let fired = fired_rx.wait_for(|fired| *fired).await.is_ok();
                if !fired {
                    debug!("Alarm timer vanished before firing");
                }
            }
        }

        Ok(())
    }

    /// Cancel any pending timer and return to idle.
    ///
    /// Clears the fired flag even if the timer already fired. Fails only if
    /// the alarm was never started; repeated resets after a start succeed.
    pub fn reset(&mut self) -> Result<(), AlarmError> {
        if !self.started_once {
            return Err(AlarmError::ResetWithoutStarting);
        }
        self.cancel();
        Ok(())
    }

    /// Cancel any pending timer. Same state effect as [`reset`](Self::reset).
    pub fn stop(&mut self) -> Result<(), AlarmError> {
        if !self.started_once {
            return Err(AlarmError::StopWithoutStarting);
        }
        self.cancel();
        Ok(())
    }

    /// Reset and start again, from any state.
    pub fn restart(&mut self) -> Result<(), AlarmError> {
        self.cancel();
        self.start()
    }

    /// Start the alarm for the lifetime of the returned guard.
    ///
    /// The guard stops the alarm when dropped, whichever way the scope is
    /// left.
    pub fn scoped(&mut self) -> Result<AlarmGuard<'_>, AlarmError> {
        self.start()?;
        Ok(AlarmGuard { alarm: self })
    }

    fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.timer.abort();
            trace!(fired = armed.is_fired(), "Alarm cancelled");
        }
    }
}

impl Drop for Alarm {
    fn drop(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.timer.abort();
        }
    }
}

/// Keeps an [`Alarm`] started until dropped.
///
/// Dereferences to the alarm so the scope can [`wait`](Alarm::wait) on it.
#[derive(Debug)]
pub struct AlarmGuard<'a> {
    alarm: &'a mut Alarm,
}

impl Deref for AlarmGuard<'_> {
    type Target = Alarm;

    fn deref(&self) -> &Alarm {
        self.alarm
    }
}

impl DerefMut for AlarmGuard<'_> {
    fn deref_mut(&mut self) -> &mut Alarm {
        self.alarm
    }
}

impl Drop for AlarmGuard<'_> {
    fn drop(&mut self) {
        self.alarm.cancel();
    }
}

/// `now + timeout`, saturating to a far-future instant on overflow.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 30))
}
