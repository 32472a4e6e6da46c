//! Core wire types, codec and observability for pubsock
//!
//! This crate holds everything that does not depend on a live connection:
//!
//! - **Types**: outbound channel requests and inbound envelopes
//! - **Codec**: JSON encoding and envelope classification
//! - **Error handling**: the error taxonomy shared by all pubsock crates
//! - **Observability**: tracing subscriber and OpenTelemetry bootstrap
//!
//! The `pubsock-client` crate builds the self-healing connection on top of it.
//!
//! # Example
//!
//! ```rust
//! use pubsock_core::{codec, ChannelRequest, InboundMessage};
//!
//! let frame = codec::encode_request(&ChannelRequest::subscribe("trades")).unwrap();
//! assert!(frame.contains("\"op\":\"subscribe\""));
//!
//! let inbound = codec::decode(r#"{"type":"response","op":"subscribe","success":true,"data":{"channel":"trades"}}"#).unwrap();
//! match inbound {
//!     InboundMessage::Response(response) => assert_eq!(response.channel(), Some("trades")),
//!     _ => unreachable!(),
//! }
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod types;

pub use error::{Error, Result};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use types::{ChannelRequest, Envelope, InboundMessage, Op, Response};
