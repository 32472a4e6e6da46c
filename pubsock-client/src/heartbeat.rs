//! Heartbeat monitor
//!
//! While connected the client sends a liveness probe every `ping_interval`.
//! Each probe arms a `pong_timeout` deadline; a reply disarms it, and a
//! deadline that expires means the connection is dead.
//!
//! ```text
//! tick ──► cancel deadline ──► send probe ──► arm deadline
//!                                                 │
//!                          reply ◄────────────────┤
//!                     (disarm deadline)           ▼
//!                                         expiry: connection lost
//! ```
//!
//! The monitor only owns the timers. Sending the probe and reacting to an
//! expired deadline are left to the connection state machine.

use crate::timer::{Scheduler, Timer, TimerId, TimerKind};
use std::time::Duration;

pub(crate) struct HeartbeatMonitor {
    interval: Duration,
    timeout: Duration,
    probe: Option<Timer>,
    deadline: Option<Timer>,
}

impl HeartbeatMonitor {
    pub(crate) fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            probe: None,
            deadline: None,
        }
    }

    /// Start probing, replacing any previous schedule
    pub(crate) fn start(&mut self, scheduler: &mut Scheduler) {
        self.stop();
        self.probe = Some(scheduler.repeating(self.interval, TimerKind::Probe));
        tracing::debug!(interval_ms = self.interval.as_millis() as u64, "Heartbeat started");
    }

    /// Accept a probe tick
    ///
    /// Returns `true` when `id` belongs to the running schedule, in which case
    /// any outstanding deadline has been cancelled and the caller should send
    /// a probe and then call [`arm_deadline`](Self::arm_deadline).
    pub(crate) fn on_tick(&mut self, id: TimerId) -> bool {
        if !matches!(&self.probe, Some(timer) if timer.id() == id) {
            return false;
        }
        self.deadline = None;
        true
    }

    /// Wait `pong_timeout` for the reply to the probe just sent
    pub(crate) fn arm_deadline(&mut self, scheduler: &mut Scheduler) {
        self.deadline = Some(scheduler.once(self.timeout, TimerKind::ProbeDeadline));
    }

    /// The remote answered; an unsolicited reply is harmless
    pub(crate) fn on_reply(&mut self) {
        if self.deadline.take().is_some() {
            tracing::trace!("Heartbeat reply received");
        }
    }

    /// Accept a deadline expiry
    ///
    /// Returns `true` when `id` is the armed deadline. The monitor is stopped
    /// in that case and the connection must be treated as lost.
    pub(crate) fn on_deadline(&mut self, id: TimerId) -> bool {
        if !matches!(&self.deadline, Some(timer) if timer.id() == id) {
            return false;
        }
        self.stop();
        true
    }

    /// Cancel both timers
    pub(crate) fn stop(&mut self) {
        if self.probe.take().is_some() {
            tracing::debug!("Heartbeat stopped");
        }
        self.deadline = None;
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.probe.is_some()
    }

    #[cfg(test)]
    pub(crate) fn awaiting_reply(&self) -> bool {
        self.deadline.is_some()
    }
}
