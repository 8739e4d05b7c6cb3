//! Envelope dispatcher.
//!
//! DESIGN
//! ======
//! `on_frame` is the whole inbound path for one frame: decode, route by type,
//! run the handler, and return what the connection must do next. It never
//! writes to the transport itself. SYSTEM control topics come back as a
//! `SystemSignal` for the state machine, and automatic acknowledgments (ping
//! echoes, EVENT acks) come back as `replies` for the caller to write in
//! order.
//!
//! CALLBACK handlers acknowledge on their own through the `Replier`; those
//! replies travel the command queue, not `replies`.

use envelope::{DownstreamEnvelope, EnvelopeType, EventAckData, SystemTopic, UpstreamEnvelope};
use tracing::{debug, info, warn};

use crate::ack::Replier;
use crate::error::{ClientError, ErrorCode};
use crate::registry::CallbackRegistry;

/// Control signal extracted from a SYSTEM envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemSignal {
    Connected,
    Registered,
    Disconnect,
    KeepAlive,
}

/// What the connection must do after one inbound frame.
#[derive(Debug, Default, PartialEq)]
pub struct Dispatched {
    pub signal: Option<SystemSignal>,
    /// Acknowledgments to write, in order.
    pub replies: Vec<UpstreamEnvelope>,
}

impl Dispatched {
    fn signal(signal: SystemSignal) -> Self {
        Self { signal: Some(signal), replies: Vec::new() }
    }

    fn reply(reply: UpstreamEnvelope) -> Self {
        Self { signal: None, replies: vec![reply] }
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    registry: CallbackRegistry,
    replier: Replier,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: CallbackRegistry, replier: Replier) -> Self {
        Self { registry, replier }
    }

    /// Process one text frame.
    pub async fn on_frame(&self, raw: &str) -> Dispatched {
        let envelope = match envelope::decode_envelope(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                drop_frame(&ClientError::from(e));
                return Dispatched::default();
            }
        };

        debug!(kind = ?envelope.kind, topic = envelope.topic(), message_id = envelope.message_id(), "frame received");
        match envelope.kind {
            EnvelopeType::System => on_system(&envelope),
            EnvelopeType::Event => self.on_event(envelope).await,
            EnvelopeType::Callback => {
                self.on_callback(envelope).await;
                Dispatched::default()
            }
            EnvelopeType::Unknown => {
                debug!(topic = envelope.topic(), "ignoring envelope of unknown type");
                Dispatched::default()
            }
        }
    }

    /// Process one binary frame. The payload must be UTF-8 JSON.
    pub async fn on_binary(&self, raw: &[u8]) -> Dispatched {
        match std::str::from_utf8(raw) {
            Ok(text) => self.on_frame(text).await,
            Err(e) => {
                drop_frame(&ClientError::Protocol(format!("binary frame is not utf-8: {e}")));
                Dispatched::default()
            }
        }
    }

    async fn on_event(&self, envelope: DownstreamEnvelope) -> Dispatched {
        if envelope.message_id().is_empty() {
            drop_frame(&ClientError::Protocol("event envelope has no message id".into()));
            return Dispatched::default();
        }

        let message_id = envelope.message_id().to_owned();
        let ack = match self.registry.catch_all() {
            Some(handler) => handler.on_event(envelope).await,
            None => EventAckData::success(),
        };

        match envelope::encode_data(&ack) {
            Ok(data) => Dispatched::reply(UpstreamEnvelope::ack(message_id, data)),
            Err(e) => {
                warn!(%message_id, error = %e, "event ack could not be encoded");
                Dispatched::default()
            }
        }
    }

    async fn on_callback(&self, envelope: DownstreamEnvelope) {
        let Some(handler) = self.registry.callback(envelope.topic()) else {
            debug!(topic = envelope.topic(), "no handler for callback topic");
            return;
        };
        handler.on_callback(envelope, self.replier.clone()).await;
    }
}

fn on_system(envelope: &DownstreamEnvelope) -> Dispatched {
    match SystemTopic::from_topic(envelope.topic()) {
        SystemTopic::Connected => Dispatched::signal(SystemSignal::Connected),
        SystemTopic::Registered => Dispatched::signal(SystemSignal::Registered),
        SystemTopic::Disconnect => {
            info!("gateway requested disconnect");
            Dispatched::signal(SystemSignal::Disconnect)
        }
        SystemTopic::KeepAlive => Dispatched::signal(SystemSignal::KeepAlive),
        SystemTopic::Ping => Dispatched::reply(UpstreamEnvelope::echo(envelope)),
        SystemTopic::Other => {
            debug!(topic = envelope.topic(), "ignoring system topic");
            Dispatched::default()
        }
    }
}

fn drop_frame(err: &ClientError) {
    warn!(error = %err, code = err.error_code(), "dropping inbound frame");
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod tests;
