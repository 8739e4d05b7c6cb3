//! Wire envelopes exchanged with the stream gateway.
//!
//! This crate owns the JSON representation of every frame on the persistent
//! connection: downstream envelopes pushed by the gateway and upstream
//! acknowledgments written back by the client. Field names are part of the
//! gateway contract and must not change. Payloads stay opaque strings; only
//! the routing metadata is typed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Content type written on every acknowledgment.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Status code carried by a successful acknowledgment.
pub const ACK_CODE_OK: u16 = 200;

/// Status message carried by a successful acknowledgment.
pub const ACK_MESSAGE_OK: &str = "OK";

/// Topic of the wildcard EVENT subscription.
pub const TOPIC_ALL_EVENTS: &str = "*";

/// Robot message callback topic.
pub const TOPIC_ROBOT: &str = "/v1.0/im/bot/messages/get";

/// Interactive card callback topic.
pub const TOPIC_CARD: &str = "/v1.0/card/instances/callback";

/// AI plugin (graph API) invocation topic.
pub const TOPIC_AI_GRAPH_API: &str = "/v1.0/graph/api/invoke";

/// Error returned by the envelope codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw text is not a valid downstream envelope.
    #[error("failed to decode envelope: {0}")]
    Decode(serde_json::Error),
    /// A value could not be serialized for the wire.
    #[error("failed to encode envelope: {0}")]
    Encode(serde_json::Error),
}

// =============================================================================
// DOWNSTREAM
// =============================================================================

/// Discriminant of a downstream envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnvelopeType {
    /// Connection control traffic (registration, ping, disconnect).
    System,
    /// Broadcast event, acknowledged by the catch-all handler's result.
    Event,
    /// Topic callback, acknowledged explicitly by its handler.
    Callback,
    /// Any type this client does not know about.
    #[serde(other)]
    Unknown,
}

/// Envelope headers. Unrecognized headers are preserved in `extra` so an
/// echoed envelope carries them back unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Headers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_type: String,
    /// Correlation key for acknowledgments.
    #[serde(default)]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub time: String,
    /// Routing key: a system topic, an event topic, or a callback topic.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub topic: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single frame pushed by the gateway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownstreamEnvelope {
    #[serde(default)]
    pub spec_version: String,
    #[serde(rename = "type")]
    pub kind: EnvelopeType,
    #[serde(default)]
    pub headers: Headers,
    /// JSON-encoded payload, opaque to the client.
    #[serde(default)]
    pub data: String,
}

impl DownstreamEnvelope {
    /// Routing topic from the headers.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.headers.topic
    }

    /// Correlation id from the headers.
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.headers.message_id
    }
}

/// Control topics carried by SYSTEM envelopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemTopic {
    Connected,
    Registered,
    Disconnect,
    KeepAlive,
    Ping,
    /// A control topic this client does not act on.
    Other,
}

impl SystemTopic {
    /// Classify a SYSTEM envelope's `headers.topic`. Matching is exact; the
    /// gateway mixes upper and lower case topics.
    #[must_use]
    pub fn from_topic(topic: &str) -> Self {
        match topic {
            "CONNECTED" => Self::Connected,
            "REGISTERED" => Self::Registered,
            "disconnect" => Self::Disconnect,
            "KEEPALIVE" => Self::KeepAlive,
            "ping" => Self::Ping,
            _ => Self::Other,
        }
    }
}

// =============================================================================
// UPSTREAM
// =============================================================================

/// Acknowledgment written back to the gateway for one downstream envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpstreamEnvelope {
    pub code: u16,
    pub headers: Headers,
    pub message: String,
    pub data: String,
}

impl UpstreamEnvelope {
    /// Build a success acknowledgment for `message_id` carrying `data`.
    #[must_use]
    pub fn ack(message_id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            code: ACK_CODE_OK,
            headers: Headers {
                content_type: CONTENT_TYPE_JSON.to_owned(),
                message_id: message_id.into(),
                ..Headers::default()
            },
            message: ACK_MESSAGE_OK.to_owned(),
            data: data.into(),
        }
    }

    /// Build the answer to a SYSTEM ping: headers and data are echoed as-is.
    #[must_use]
    pub fn echo(downstream: &DownstreamEnvelope) -> Self {
        Self {
            code: ACK_CODE_OK,
            headers: downstream.headers.clone(),
            message: ACK_MESSAGE_OK.to_owned(),
            data: downstream.data.clone(),
        }
    }

    /// Correlation id this acknowledgment answers.
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.headers.message_id
    }
}

/// Status returned by a catch-all event handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventAck {
    /// Processed; the gateway must not redeliver.
    Success,
    /// Not processed yet; the gateway may redeliver later.
    Later,
}

/// Payload of an EVENT acknowledgment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAckData {
    pub status: EventAck,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EventAckData {
    #[must_use]
    pub fn success() -> Self {
        Self { status: EventAck::Success, message: None }
    }

    #[must_use]
    pub fn later(message: impl Into<String>) -> Self {
        Self { status: EventAck::Later, message: Some(message.into()) }
    }
}

impl Default for EventAckData {
    fn default() -> Self {
        Self::success()
    }
}

/// Response shape expected by the AI plugin (graph API) topic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphApiResponse {
    pub response: GraphApiResponseBody,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphApiResponseBody {
    pub status_line: StatusLine,
    #[serde(default)]
    pub headers: Map<String, Value>,
    /// Response body, usually JSON text.
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLine {
    pub code: u16,
    pub reason_phrase: String,
}

impl GraphApiResponse {
    /// A `200 OK` response with no headers and the given body.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            response: GraphApiResponseBody {
                status_line: StatusLine { code: ACK_CODE_OK, reason_phrase: ACK_MESSAGE_OK.to_owned() },
                headers: Map::new(),
                body: body.into(),
            },
        }
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Decode one text frame into a downstream envelope.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed JSON or a missing `type`.
pub fn decode_envelope(raw: &str) -> Result<DownstreamEnvelope, CodecError> {
    serde_json::from_str(raw).map_err(CodecError::Decode)
}

/// Encode an acknowledgment as wire text.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_upstream(envelope: &UpstreamEnvelope) -> Result<String, CodecError> {
    serde_json::to_string(envelope).map_err(CodecError::Encode)
}

/// Serialize an arbitrary payload into the string form used by `data`.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if `payload` cannot be serialized.
pub fn encode_data<T: Serialize + ?Sized>(payload: &T) -> Result<String, CodecError> {
    serde_json::to_string(payload).map_err(CodecError::Encode)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
