//! Client metrics definitions
//!
//! OpenTelemetry instruments describing connection health. They are recorded
//! by the connection task when metrics are enabled on the builder and pushed
//! by whatever meter provider is installed globally (see
//! `pubsock_core::init_observability`).
//!
//! # Metrics Collected
//!
//! - **connection_state**: current connection state code (gauge)
//! - **connections_total**: transports that reached the open state (counter)
//! - **reconnection_attempts**: scheduled reconnects (counter)
//! - **heartbeat_timeouts**: probe replies that missed their deadline (counter)
//! - **frames_sent**: subscribe/unsubscribe frames sent, by `op` (counter)
//! - **updates_received**: update envelopes delivered (counter)
//! - **errors_total**: protocol, decode and transport errors, by `error_type`
//!   (counter)
//!
//! # Examples
//!
//! ```rust,no_run
//! use pubsock_client::ClientMetrics;
//!
//! let metrics = ClientMetrics::new("ticker-feed");
//! metrics.record_update();
//! ```

use crate::ConnectionState;
use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Meter},
    KeyValue,
};
use pubsock_core::Op;

/// Client metrics for monitoring
pub struct ClientMetrics {
    /// Connection state (0=initial, 1=connecting, 2=connected, 3=closing, 4=reconnecting)
    pub connection_state: Gauge<i64>,
    /// Total number of opened connections
    pub connections_total: Counter<u64>,
    /// Total number of reconnection attempts
    pub reconnection_attempts: Counter<u64>,
    /// Total number of heartbeat deadline expiries
    pub heartbeat_timeouts: Counter<u64>,
    /// Total number of channel request frames sent
    pub frames_sent: Counter<u64>,
    /// Total number of updates received
    pub updates_received: Counter<u64>,
    /// Total number of errors
    pub errors_total: Counter<u64>,
}

impl ClientMetrics {
    /// Create a new ClientMetrics instance
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Create a new ClientMetrics instance with a custom meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connection_state: meter
                .i64_gauge("pubsock.client.connection.state")
                .with_description(
                    "Connection state (0=initial, 1=connecting, 2=connected, 3=closing, 4=reconnecting)",
                )
                .build(),
            connections_total: meter
                .u64_counter("pubsock.client.connections.total")
                .with_description("Total number of connections opened")
                .build(),
            reconnection_attempts: meter
                .u64_counter("pubsock.client.reconnection.attempts")
                .with_description("Total number of reconnection attempts")
                .build(),
            heartbeat_timeouts: meter
                .u64_counter("pubsock.client.heartbeat.timeouts")
                .with_description("Total number of heartbeat replies that missed their deadline")
                .build(),
            frames_sent: meter
                .u64_counter("pubsock.client.frames.sent")
                .with_description("Total number of subscribe/unsubscribe frames sent")
                .build(),
            updates_received: meter
                .u64_counter("pubsock.client.updates.received")
                .with_description("Total number of updates received")
                .build(),
            errors_total: meter
                .u64_counter("pubsock.client.errors.total")
                .with_description("Total number of errors encountered")
                .build(),
        }
    }

    /// Update connection state
    pub fn update_connection_state(&self, state: ConnectionState) {
        self.connection_state.record(state.as_gauge(), &[]);
    }

    /// Record a connection reaching the open state
    pub fn record_connection(&self) {
        self.connections_total.add(1, &[]);
    }

    /// Record a reconnection attempt
    pub fn record_reconnection_attempt(&self) {
        self.reconnection_attempts.add(1, &[]);
    }

    /// Record a heartbeat deadline expiry
    pub fn record_heartbeat_timeout(&self) {
        self.heartbeat_timeouts.add(1, &[]);
    }

    /// Record a channel request frame
    pub fn record_frame_sent(&self, op: Op) {
        self.frames_sent.add(1, &[KeyValue::new("op", op.as_str())]);
    }

    /// Record an update delivered to the caller
    pub fn record_update(&self) {
        self.updates_received.add(1, &[]);
    }

    /// Record an error
    pub fn record_error(&self, error_type: &str) {
        let attributes = &[KeyValue::new("error_type", error_type.to_string())];
        self.errors_total.add(1, attributes);
    }
}
