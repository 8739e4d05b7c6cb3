//! Acknowledgment sender.
//!
//! A `Replier` queues upstream envelopes to the connection task, which writes
//! them on whatever transport is current. Sending is fire-and-forget: if the
//! task has ended the envelope is dropped with a warning.

use envelope::{GraphApiResponse, UpstreamEnvelope};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::connection::Command;
use crate::error::ClientError;

/// Cloneable handle for acknowledging callbacks by message id.
#[derive(Clone, Debug)]
pub struct Replier {
    commands: mpsc::UnboundedSender<Command>,
}

impl Replier {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>) -> Self {
        Self { commands }
    }

    /// Send `{code:200, message:"OK", data:<payload as JSON text>}` keyed by
    /// `message_id`.
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] for an empty `message_id` or a payload that
    /// cannot be serialized. Nothing is queued in either case.
    pub fn reply<T: Serialize + ?Sized>(&self, message_id: &str, payload: &T) -> Result<(), ClientError> {
        if message_id.is_empty() {
            return Err(ClientError::Config("reply requires a message id".into()));
        }
        let data = envelope::encode_data(payload).map_err(|e| ClientError::Config(e.to_string()))?;
        self.queue(UpstreamEnvelope::ack(message_id, data));
        Ok(())
    }

    /// Acknowledge a graph API invocation with an HTTP-shaped response.
    ///
    /// # Errors
    ///
    /// Same as [`Replier::reply`].
    pub fn reply_graph_api(&self, message_id: &str, response: &GraphApiResponse) -> Result<(), ClientError> {
        self.reply(message_id, response)
    }

    pub(crate) fn queue(&self, envelope: UpstreamEnvelope) {
        let message_id = envelope.message_id().to_owned();
        if self.commands.send(Command::Send(envelope)).is_err() {
            warn!(%message_id, "connection task gone; reply dropped");
            return;
        }
        debug!(%message_id, "reply queued");
    }
}

#[cfg(test)]
#[path = "ack_test.rs"]
mod tests;
