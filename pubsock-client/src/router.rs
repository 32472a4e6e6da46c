//! Inbound message routing
//!
//! Every text frame received while connected goes through [`route`]:
//!
//! - `response` envelopes acknowledge or reject a channel request and are
//!   only logged
//! - `update` envelopes are handed to the caller verbatim
//! - anything else is logged as unhandled
//!
//! Routing never fails the connection. A frame that cannot be decoded is
//! reported to the caller of `route`, which logs and drops it.

use pubsock_core::{codec, Error, InboundMessage, Op, Response, Result};
use serde_json::Value;

/// Outcome of routing one inbound frame
#[derive(Debug)]
pub(crate) enum Routed {
    /// The server accepted a subscribe or unsubscribe request
    Acknowledged { op: Op, channel: Option<String> },
    /// The server refused a subscribe or unsubscribe request
    Rejected(Error),
    /// A response to an operation the client never sends
    UnknownResponse,
    /// An update to deliver to the caller
    Update(Value),
    /// An envelope of unknown type
    Unhandled,
}

pub(crate) fn route(text: &str) -> Result<Routed> {
    let routed = match codec::decode(text)? {
        InboundMessage::Response(response) => route_response(response),
        InboundMessage::Update(message) => Routed::Update(message),
        InboundMessage::Unhandled { kind, message } => {
            tracing::warn!(kind = ?kind, message = %message, "Unhandled message type");
            Routed::Unhandled
        }
    };
    Ok(routed)
}

fn route_response(response: Response) -> Routed {
    let Some(op) = response.operation() else {
        tracing::warn!(op = ?response.op, response = %response.raw, "Unhandled response");
        return Routed::UnknownResponse;
    };
    let channel = response.channel().map(str::to_string);

    if response.success {
        match op {
            Op::Subscribe => tracing::debug!(channel = ?channel, "Subscribed to channel"),
            Op::Unsubscribe => tracing::debug!(channel = ?channel, "Unsubscribed from channel"),
        }
        return Routed::Acknowledged { op, channel };
    }

    tracing::error!(
        op = %op,
        channel = ?channel,
        response = %response.raw,
        "Could not {} channel",
        op
    );
    Routed::Rejected(Error::Protocol {
        op: op.as_str().to_string(),
        channel,
        response: response.raw,
    })
}
