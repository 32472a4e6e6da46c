//! Cancellable timers feeding the connection state machine
//!
//! Every timer is a small tokio task that posts `Input::Timer` back to the
//! state machine when it fires. The returned [`Timer`] guard aborts the task
//! on drop, and each timer carries a unique [`TimerId`] so that a tick which
//! was already queued when its timer got cancelled can be recognised and
//! ignored.

use crate::connection::Input;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Unique identity of one armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TimerId(u64);

/// What a timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    /// Periodic liveness probe
    Probe,
    /// Deadline for the reply to the last probe
    ProbeDeadline,
    /// Delay before the next connection attempt
    Reconnect,
}

/// Guard for an armed timer; dropping it cancels the timer
#[derive(Debug)]
pub(crate) struct Timer {
    id: TimerId,
    task: JoinHandle<()>,
}

impl Timer {
    pub(crate) fn id(&self) -> TimerId {
        self.id
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Arms timers that report to one state machine
pub(crate) struct Scheduler {
    tx: mpsc::UnboundedSender<Input>,
    next_id: u64,
}

impl Scheduler {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Input>) -> Self {
        Self { tx, next_id: 0 }
    }

    fn allocate(&mut self) -> TimerId {
        self.next_id += 1;
        TimerId(self.next_id)
    }

    /// Fire once after `delay`
    pub(crate) fn once(&mut self, delay: Duration, kind: TimerKind) -> Timer {
        let id = self.allocate();
        let tx = self.tx.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Input::Timer { kind, id });
        });

        Timer { id, task }
    }

    /// Fire every `period`, first after one full period
    pub(crate) fn repeating(&mut self, period: Duration, kind: TimerKind) -> Timer {
        let id = self.allocate();
        let tx = self.tx.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if tx.send(Input::Timer { kind, id }).is_err() {
                    break;
                }
            }
        });

        Timer { id, task }
    }
}
