//! Codec for pubsock envelopes
//!
//! Encoding is plain serde; decoding adds the classification step the client
//! routes on. A frame must be a JSON object to count as an envelope: invalid
//! JSON and non-object values are both reported as [`Error::Decode`].
//!
//! # Examples
//!
//! ```rust
//! use pubsock_core::{codec, ChannelRequest};
//!
//! let text = codec::encode_request(&ChannelRequest::subscribe("trades")).unwrap();
//! assert_eq!(text, r#"{"op":"subscribe","channel":"trades"}"#);
//!
//! let message = codec::decode(r#"{"type":"update","channel":"trades","price":1}"#).unwrap();
//! assert!(message.is_update());
//! ```

use crate::error::{Error, Result};
use crate::types::{ChannelRequest, Envelope, InboundMessage, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Encode any serializable message to a JSON string
pub fn encode<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode a subscribe/unsubscribe frame
pub fn encode_request(request: &ChannelRequest) -> Result<String> {
    encode(request)
}

/// Decode a text frame into a classified inbound message
///
/// # Errors
///
/// Returns `Error::Decode` when the text is not JSON, is not a JSON object,
/// or has header fields of the wrong type (e.g. a numeric `type`).
pub fn decode(text: &str) -> Result<InboundMessage> {
    let value: Value = serde_json::from_str(text)?;
    classify(value)
}

/// Classify an already-parsed JSON value
pub fn classify(value: Value) -> Result<InboundMessage> {
    if !value.is_object() {
        return Err(Error::Decode(format!(
            "expected a JSON object envelope, got {}",
            value_kind(&value)
        )));
    }

    let envelope = Envelope::deserialize(&value).map_err(|e| Error::Decode(e.to_string()))?;

    let message = match envelope.kind.as_deref() {
        Some("response") => InboundMessage::Response(Response {
            op: envelope.op,
            success: envelope.success.as_ref().map(is_truthy).unwrap_or(false),
            data: envelope.data,
            raw: value,
        }),
        Some("update") => InboundMessage::Update(value),
        _ => InboundMessage::Unhandled {
            kind: envelope.kind,
            message: value,
        },
    };

    Ok(message)
}

/// JSON truthiness, as servers sometimes send `1`/`0` or strings for flags
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
