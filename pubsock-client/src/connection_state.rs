//! Connection state
//!
//! # Connection States
//!
//! - **Initial**: before the first attempt, and again after an explicit close
//! - **Connecting**: a transport is being opened
//! - **Connected**: open, subscriptions replayed, heartbeat running
//! - **Closing**: an explicit close is in progress
//! - **Reconnecting**: connection lost, waiting out the reconnect delay
//!
//! # State Transitions
//!
//! ```text
//! Initial ──► Connecting ──► Connected ──► Closing ──► Initial
//!                ▲  │            │            ▲
//!                │  ▼            ▼            │
//!              Reconnecting ◄────┘ ───────────┘
//! ```
//!
//! The current state is published on a `watch` channel so clients can read
//! it without talking to the connection task.

use tokio::sync::watch;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected and not trying to
    #[default]
    Initial,
    /// Attempting to connect
    Connecting,
    /// Successfully connected
    Connected,
    /// Explicit close in progress
    Closing,
    /// Waiting to reconnect after losing the connection
    Reconnecting,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Initial, Connecting)
                | (Connecting, Connected)
                | (Connecting, Reconnecting)
                | (Connecting, Closing)
                | (Connected, Reconnecting)
                | (Connected, Closing)
                | (Reconnecting, Connecting)
                | (Reconnecting, Closing)
                | (Closing, Initial)
        )
    }

    /// Numeric code exported on the connection state gauge
    pub fn as_gauge(&self) -> i64 {
        match self {
            ConnectionState::Initial => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Closing => 3,
            ConnectionState::Reconnecting => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Initial => "initial",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closing => "closing",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner side of the published connection state
pub(crate) struct StateTracker {
    tx: watch::Sender<ConnectionState>,
}

impl StateTracker {
    pub(crate) fn new() -> (Self, watch::Receiver<ConnectionState>) {
        let (tx, rx) = watch::channel(ConnectionState::Initial);
        (Self { tx }, rx)
    }

    pub(crate) fn get(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Publish a new state
    pub(crate) fn set(&self, next: ConnectionState) {
        let current = self.get();
        if current == next {
            return;
        }
        if !current.can_transition_to(next) {
            tracing::warn!(from = %current, to = %next, "Unexpected state transition");
        }
        tracing::debug!(from = %current, to = %next, "Connection state changed");
        self.tx.send_replace(next);
    }
}
