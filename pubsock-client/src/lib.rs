//! Self-healing pub/sub client over WebSocket
//!
//! This crate keeps a subscription-based WebSocket feed alive without caller
//! involvement. It detects dead connections with a heartbeat, reconnects after
//! a delay, and replays every subscription once the new connection opens.
//!
//! # Core Features
//!
//! - **Connection state machine**: a single task owns all connection state
//! - **Heartbeat**: periodic liveness probes with a reply deadline
//! - **Auto-reconnect**: fixed delay by default, pluggable strategies
//! - **Subscription replay**: the desired channel set survives reconnects
//! - **Routing**: responses are logged, updates are handed to the caller
//! - **Observability**: `tracing` logs and OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pubsock_client::{ClientOptions, Notification, PubSubClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PubSubClient::new("wss://feed.example.com/ws", ClientOptions::default())?;
//!     let mut events = client.events();
//!
//!     client.subscribe(["trades", "quotes"])?;
//!
//!     while let Ok(event) = events.recv().await {
//!         if let Notification::Update(update) = event {
//!             println!("{}", update);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Custom Transport
//!
//! The connection task only talks to the [`Transport`] trait, so the socket
//! can be replaced, for example by a scripted one in tests:
//!
//! ```rust,no_run
//! use pubsock_client::{ClientBuilder, WsTransport};
//! use std::time::Duration;
//!
//! # fn example() -> pubsock_core::Result<()> {
//! let client = ClientBuilder::new("ws://localhost:8080")
//!     .with_transport(WsTransport::new().with_close_timeout(Duration::from_secs(5)))
//!     .connect()?;
//! # Ok(())
//! # }
//! ```

mod client;
mod client_builder;
mod connection;
mod connection_state;
mod heartbeat;
mod metrics;
mod notification;
mod options;
mod reconnect;
mod router;
mod subscription;
mod timer;
mod transport;
mod ws_transport;

pub use client::PubSubClient;
pub use client_builder::ClientBuilder;
pub use connection_state::ConnectionState;
pub use metrics::ClientMetrics;
pub use notification::{Notification, NotificationFn, NotificationKind, Notifier};
pub use options::{
    ClientOptions, DEFAULT_PING_INTERVAL, DEFAULT_PONG_TIMEOUT, DEFAULT_RECONNECT_TIMEOUT,
};
pub use reconnect::{ExponentialBackoff, FixedDelay, ReconnectionStrategy};
pub use subscription::IntoChannels;
pub use transport::{EventSink, Generation, Transport, TransportEvent, TransportHandle};
pub use ws_transport::{WsTransport, DEFAULT_CLOSE_TIMEOUT};
