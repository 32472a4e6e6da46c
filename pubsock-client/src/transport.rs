//! Transport capability consumed by the connection state machine
//!
//! A [`Transport`] opens one socket per connection attempt and hands back a
//! [`TransportHandle`] for sending on it. Everything the socket observes is
//! reported asynchronously through the [`EventSink`] passed to `open`:
//!
//! ```text
//! opened → message* / heartbeat_reply* / error* → closed
//! ```
//!
//! Each sink is stamped with the [`Generation`] of the attempt it belongs to.
//! The state machine discards events whose generation is not the current one,
//! so a superseded socket can keep reporting without disturbing its successor.
//!
//! The default implementation is [`crate::WsTransport`]; tests plug in a
//! scripted transport through [`crate::ClientBuilder::with_transport`].

use crate::connection::Input;
use pubsock_core::{Error, Result};
use std::fmt;
use tokio::sync::mpsc;

/// Identifier of a single connection attempt
///
/// Incremented each time the client opens a new transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// The raw counter value
    pub fn get(&self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Low-level signals raised by a transport
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The socket is open and ready for traffic
    Opened,
    /// A text frame arrived
    Message(String),
    /// The socket reported an error; `Closed` normally follows
    Error(Error),
    /// The socket is gone, gracefully or not
    Closed,
    /// The remote answered a liveness probe
    HeartbeatReply,
}

/// Reporting channel handed to a transport for one connection attempt
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: Generation,
    tx: mpsc::UnboundedSender<Input>,
}

impl EventSink {
    pub(crate) fn new(generation: Generation, tx: mpsc::UnboundedSender<Input>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the attempt this sink reports for
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Report an event
    ///
    /// Returns `false` when the client has shut down and nobody is listening.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(Input::Transport {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    /// Report that the socket opened
    pub fn opened(&self) -> bool {
        self.emit(TransportEvent::Opened)
    }

    /// Report an inbound text frame
    pub fn message(&self, text: impl Into<String>) -> bool {
        self.emit(TransportEvent::Message(text.into()))
    }

    /// Report a socket error
    pub fn error(&self, error: Error) -> bool {
        self.emit(TransportEvent::Error(error))
    }

    /// Report that the socket closed
    pub fn closed(&self) -> bool {
        self.emit(TransportEvent::Closed)
    }

    /// Report a reply to a liveness probe
    pub fn heartbeat_reply(&self) -> bool {
        self.emit(TransportEvent::HeartbeatReply)
    }
}

/// Factory for socket connections
pub trait Transport: Send + Sync + 'static {
    /// Start opening a connection to `url`
    ///
    /// Must not block: the outcome of the connection is reported through
    /// `events`. An `Err` means the attempt could not even be started (for
    /// example an unparsable URL) and is treated as a failed connect.
    fn open(&self, url: &str, events: EventSink) -> Result<Box<dyn TransportHandle>>;
}

/// Exclusive handle on one open (or opening) socket
pub trait TransportHandle: Send {
    /// Queue a text frame
    fn send(&mut self, text: String) -> Result<()>;

    /// Send a liveness probe; the reply arrives as `heartbeat_reply`
    fn ping(&mut self) -> Result<()>;

    /// Start a graceful close; `closed` is reported when it completes
    fn close(&mut self);

    /// Drop the socket immediately without a close handshake
    fn terminate(&mut self);
}
