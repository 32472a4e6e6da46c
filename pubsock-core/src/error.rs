//! Error types for pubsock
//!
//! A single `Error` enum covers every failure the client can observe. None of
//! them are fatal: the connection machinery recovers from transport failures
//! by reconnecting, drops undecodable frames, and only logs protocol
//! rejections reported by the server.
//!
//! # Error Categories
//!
//! - **Transport**: the socket could not be opened, or a send failed
//! - **Decode**: an inbound frame was not a well-formed envelope
//! - **Protocol**: the server answered a subscribe/unsubscribe with `success: false`
//! - **Local**: serialization, invalid options, or a client whose actor has shut down
//!
//! # Examples
//!
//! ```rust
//! use pubsock_core::Error;
//!
//! let error = Error::Transport("connection refused".into());
//! assert!(error.is_transport());
//! assert_eq!(error.to_string(), "Transport error: connection refused");
//! ```

use thiserror::Error;

/// Result type for pubsock operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for pubsock operations
///
/// The enum is `Clone` so that errors can be fanned out to several observers
/// through the client's notification stream.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Establishing the connection or sending on it failed
    ///
    /// Recovered locally by the connection state machine, which treats it as a
    /// failed connect and schedules a reconnect.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An inbound frame could not be decoded into an envelope
    ///
    /// The frame is logged and dropped; the connection is unaffected.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The server rejected a subscribe or unsubscribe request
    #[error("Could not {op} channel {channel:?}")]
    Protocol {
        /// Operation echoed by the server (`subscribe` or `unsubscribe`)
        op: String,
        /// Channel echoed in the response data, if any
        channel: Option<String>,
        /// The full response as received
        response: serde_json::Value,
    },

    /// Serializing an outbound frame failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Client options failed validation
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// The connection actor is no longer running
    #[error("Client has shut down")]
    ClientShutdown,

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for transport-level failures
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// True when the server reported `success: false`
    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Protocol { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
