//! Client options
//!
//! Three durations drive the connection lifecycle:
//!
//! - **ping_interval**: how often a liveness probe is sent while connected
//! - **pong_timeout**: how long to wait for the probe reply before the
//!   connection is declared dead
//! - **reconnect_timeout**: fixed delay before every reconnect attempt
//!
//! Options deserialize from the camelCase millisecond form used by other
//! clients of the same protocol:
//!
//! ```rust
//! use pubsock_client::ClientOptions;
//! use std::time::Duration;
//!
//! let options: ClientOptions = serde_json::from_str(r#"{"pingInterval": 5000}"#).unwrap();
//! assert_eq!(options.ping_interval, Duration::from_secs(5));
//! assert_eq!(options.pong_timeout, Duration::from_secs(1));
//! ```

use pubsock_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default period between liveness probes
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(10_000);
/// Default deadline for a probe reply
pub const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_millis(1_000);
/// Default delay before a reconnect attempt
pub const DEFAULT_RECONNECT_TIMEOUT: Duration = Duration::from_millis(500);

const ENV_PING_INTERVAL: &str = "PUBSOCK_PING_INTERVAL_MS";
const ENV_PONG_TIMEOUT: &str = "PUBSOCK_PONG_TIMEOUT_MS";
const ENV_RECONNECT_TIMEOUT: &str = "PUBSOCK_RECONNECT_TIMEOUT_MS";

/// Timing options for a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientOptions {
    /// Period between liveness probes
    #[serde(with = "millis")]
    pub ping_interval: Duration,
    /// Deadline for a probe reply
    #[serde(with = "millis")]
    pub pong_timeout: Duration,
    /// Fixed delay before each reconnect attempt
    #[serde(with = "millis")]
    pub reconnect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            ping_interval: DEFAULT_PING_INTERVAL,
            pong_timeout: DEFAULT_PONG_TIMEOUT,
            reconnect_timeout: DEFAULT_RECONNECT_TIMEOUT,
        }
    }
}

impl ClientOptions {
    /// Options with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default options overlaid with `PUBSOCK_*_MS` environment variables
    ///
    /// Unset variables keep their defaults; unparsable values are an error.
    pub fn from_env() -> Result<Self> {
        Self::default().overlay_env(|key| std::env::var(key).ok())
    }

    fn overlay_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| -> Result<Option<Duration>> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(|ms| Some(Duration::from_millis(ms)))
                    .map_err(|e| Error::InvalidOptions(format!("{}={:?}: {}", key, raw, e))),
                None => Ok(None),
            }
        };

        if let Some(value) = read(ENV_PING_INTERVAL)? {
            self.ping_interval = value;
        }
        if let Some(value) = read(ENV_PONG_TIMEOUT)? {
            self.pong_timeout = value;
        }
        if let Some(value) = read(ENV_RECONNECT_TIMEOUT)? {
            self.reconnect_timeout = value;
        }
        Ok(self)
    }

    /// Set the probe period
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set the probe reply deadline
    pub fn with_pong_timeout(mut self, timeout: Duration) -> Self {
        self.pong_timeout = timeout;
        self
    }

    /// Set the reconnect delay
    pub fn with_reconnect_timeout(mut self, timeout: Duration) -> Self {
        self.reconnect_timeout = timeout;
        self
    }

    /// Check that the options can drive a heartbeat
    ///
    /// The probe period and reply deadline must be non-zero. A reply deadline
    /// at or past the probe period is accepted but logged: every probe cancels
    /// the previous deadline, so such a heartbeat never declares the
    /// connection dead. A zero reconnect delay retries immediately.
    pub fn validate(&self) -> Result<()> {
        if self.ping_interval.is_zero() {
            return Err(Error::InvalidOptions("ping_interval must be non-zero".into()));
        }
        if self.pong_timeout.is_zero() {
            return Err(Error::InvalidOptions("pong_timeout must be non-zero".into()));
        }
        if self.pong_timeout >= self.ping_interval {
            tracing::warn!(
                pong_timeout_ms = self.pong_timeout.as_millis() as u64,
                ping_interval_ms = self.ping_interval.as_millis() as u64,
                "pong_timeout is not shorter than ping_interval, heartbeat timeouts cannot fire"
            );
        }
        if self.reconnect_timeout.is_zero() {
            tracing::warn!("reconnect_timeout is zero, reconnects will not wait");
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
