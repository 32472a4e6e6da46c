//! Wire envelopes exchanged with a pubsock server
//!
//! All frames are JSON text. The client only ever sends channel requests:
//!
//! ```text
//! {"op": "subscribe",   "channel": "trades"}
//! {"op": "unsubscribe", "channel": "trades"}
//! ```
//!
//! The server sends two kinds of envelopes, told apart by their `type` field:
//!
//! - **response**: the answer to a channel request, echoing `op`, carrying
//!   `success` and a `data` object with the `channel`
//! - **update**: an unsolicited push; the whole object is the payload
//!
//! Anything else is classified as unhandled and ignored by the client.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Channel operation carried by outbound requests and echoed by responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    /// Start receiving updates for a channel
    Subscribe,
    /// Stop receiving updates for a channel
    Unsubscribe,
}

impl Op {
    /// Wire name of the operation
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Subscribe => "subscribe",
            Op::Unsubscribe => "unsubscribe",
        }
    }

    /// Parse a wire name, returning `None` for unknown operations
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "subscribe" => Some(Op::Subscribe),
            "unsubscribe" => Some(Op::Unsubscribe),
            _ => None,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound subscribe/unsubscribe frame
///
/// # Examples
///
/// ```rust
/// use pubsock_core::{ChannelRequest, Op};
///
/// let request = ChannelRequest::subscribe("trades");
/// assert_eq!(request.op, Op::Subscribe);
/// assert_eq!(request.channel, "trades");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRequest {
    /// Requested operation
    pub op: Op,
    /// Channel identifier
    pub channel: String,
}

impl ChannelRequest {
    /// Create a request for an arbitrary operation
    pub fn new(op: Op, channel: impl Into<String>) -> Self {
        Self {
            op,
            channel: channel.into(),
        }
    }

    /// Create a subscribe request
    pub fn subscribe(channel: impl Into<String>) -> Self {
        Self::new(Op::Subscribe, channel)
    }

    /// Create an unsubscribe request
    pub fn unsubscribe(channel: impl Into<String>) -> Self {
        Self::new(Op::Unsubscribe, channel)
    }
}

/// Header fields of an inbound envelope
///
/// Only the fields the client routes on are typed; unknown fields are kept in
/// the raw value held by [`InboundMessage`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Envelope type (`response`, `update`, or anything else)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Echoed operation on responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,

    /// Top-level channel, when the server puts it there
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Success flag on responses; any JSON value, judged by truthiness
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<Value>,

    /// Response data, normally `{"channel": ...}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A decoded response to a channel request
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Echoed operation name, as sent by the server
    pub op: Option<String>,
    /// Whether the server accepted the request
    pub success: bool,
    /// Response data object
    pub data: Option<Value>,
    /// The full response envelope
    pub raw: Value,
}

impl Response {
    /// The echoed operation, if it is one the client knows
    pub fn operation(&self) -> Option<Op> {
        self.op.as_deref().and_then(Op::from_wire)
    }

    /// The channel the response refers to
    ///
    /// Read from `data.channel`, falling back to a top-level `channel`.
    pub fn channel(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|data| data.get("channel"))
            .or_else(|| self.raw.get("channel"))
            .and_then(Value::as_str)
    }
}

/// An inbound envelope classified by its `type`
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Answer to a subscribe/unsubscribe request
    Response(Response),
    /// Unsolicited push, carried verbatim
    Update(Value),
    /// Any other envelope type (including a missing one)
    Unhandled {
        /// The `type` field, if present
        kind: Option<String>,
        /// The full envelope
        message: Value,
    },
}

impl InboundMessage {
    /// Check if this is a response
    pub fn is_response(&self) -> bool {
        matches!(self, InboundMessage::Response(_))
    }

    /// Check if this is an update
    pub fn is_update(&self) -> bool {
        matches!(self, InboundMessage::Update(_))
    }

    /// Check if this envelope is of an unknown type
    pub fn is_unhandled(&self) -> bool {
        matches!(self, InboundMessage::Unhandled { .. })
    }
}
