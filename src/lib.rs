//! pubsock - resilient publish/subscribe over WebSocket
//!
//! This is the convenience crate that re-exports the pubsock sub-crates.
//! Use it if you want a single dependency.
//!
//! # Architecture
//!
//! pubsock is organized into modular crates:
//!
//! - **pubsock-core**: wire types, codec, error handling, observability
//! - **pubsock-client**: the self-healing client (state machine, heartbeat,
//!   reconnect, subscription replay)
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pubsock::{ClientOptions, Notification, PubSubClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PubSubClient::new("wss://feed.example.com/ws", ClientOptions::from_env()?)?;
//!
//!     client.on_update(|notification| async move {
//!         if let Notification::Update(update) = notification {
//!             println!("{}", update);
//!         }
//!     }).await;
//!
//!     client.subscribe(["trades", "quotes"])?;
//!     tokio::signal::ctrl_c().await?;
//!     client.close()?;
//!     Ok(())
//! }
//! ```

// Re-export the sub-crates so everything is reachable through `pubsock::`
pub use pubsock_client as client;
pub use pubsock_core as core;

// Convenience re-exports of the most commonly used types
pub use pubsock_client::{
    ClientBuilder, ClientOptions, ConnectionState, Notification, PubSubClient,
};
pub use pubsock_core::{Error, Result};
