//! Reconnection strategies
//!
//! When a connection is lost the state machine asks its strategy how long to
//! wait before the next attempt. A strategy never gives up: the client keeps
//! trying until it is closed explicitly.
//!
//! # Built-in Strategies
//!
//! - **FixedDelay**: the same delay before every attempt (default, using
//!   `ClientOptions::reconnect_timeout`)
//! - **ExponentialBackoff**: doubling delays capped at a maximum, with
//!   optional jitter
//!
//! # Examples
//!
//! ```rust
//! use pubsock_client::{ExponentialBackoff, ReconnectionStrategy};
//! use std::time::Duration;
//!
//! let mut backoff = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(5));
//! assert_eq!(backoff.next_delay(0), Duration::from_millis(100));
//! assert_eq!(backoff.next_delay(3), Duration::from_millis(800));
//! ```

use std::time::Duration;

/// Policy deciding the delay before each reconnect attempt
///
/// `attempt` counts consecutive failed attempts since the last successful
/// connection, starting at 0. `reset` is called whenever a connection opens.
pub trait ReconnectionStrategy: Send + Sync {
    /// Delay before the next reconnection attempt
    fn next_delay(&mut self, attempt: u32) -> Duration;

    /// Reset accumulated state after a successful connection
    fn reset(&mut self);
}

/// Fixed delay reconnection strategy
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Create a new fixed delay strategy
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&mut self, _attempt: u32) -> Duration {
        self.delay
    }

    fn reset(&mut self) {}
}

/// Exponential backoff reconnection strategy with optional jitter
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    min_delay: Duration,
    max_delay: Duration,
    jitter: bool,
    current_attempt: u32,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay,
            jitter: false,
            current_attempt: 0,
        }
    }

    /// Add up to 25% random jitter to every delay
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(30)).with_jitter()
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&mut self, attempt: u32) -> Duration {
        self.current_attempt = attempt;

        // min_delay * 2^attempt, saturating, capped at max_delay
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let base = (self.min_delay.as_millis() as u64).saturating_mul(factor);
        let delay = base.min(self.max_delay.as_millis() as u64);

        if self.jitter {
            use rand::Rng;
            let jitter_ms = rand::thread_rng().gen_range(0..=(delay / 4));
            return Duration::from_millis(delay + jitter_ms);
        }

        Duration::from_millis(delay)
    }

    fn reset(&mut self) {
        self.current_attempt = 0;
    }
}
