//! Public client surface.
//!
//! `DwClient` is the builder: it collects config, callback topics, and the
//! catch-all EVENT handler. `connect()` consumes it, negotiates once, spawns
//! the connection task, and returns a cloneable `ClientHandle`.

use std::fmt;
use std::sync::Arc;

use envelope::GraphApiResponse;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use crate::ack::Replier;
use crate::config::{ClientConfig, SubscriptionKind};
use crate::connection::{Command, ConnectionTask};
use crate::dispatch::Dispatcher;
use crate::error::{ClientError, ErrorCode};
use crate::negotiate::{HttpNegotiator, Negotiate};
use crate::registry::{CallbackHandler, CallbackRegistry, EventHandler};
use crate::state::{ConnectionState, ConnectionStatus, Lifecycle};

pub struct DwClient {
    config: ClientConfig,
    registry: CallbackRegistry,
    negotiator: Arc<dyn Negotiate>,
}

impl DwClient {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self { config, registry: CallbackRegistry::new(), negotiator: Arc::new(HttpNegotiator) }
    }

    /// Replace the HTTP negotiator (staging gateways, tests).
    #[must_use]
    pub fn with_negotiator(mut self, negotiator: impl Negotiate + 'static) -> Self {
        self.negotiator = Arc::new(negotiator);
        self
    }

    /// Subscribe to a CALLBACK topic and bind its handler.
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] for an empty topic and
    /// [`ClientError::DuplicateTopic`] if the topic already has a handler.
    /// The subscription list is left unchanged on error.
    pub fn register_topic(
        mut self,
        topic: impl Into<String>,
        handler: impl CallbackHandler + 'static,
    ) -> Result<Self, ClientError> {
        let topic = topic.into();
        self.registry.bind(&topic, Box::new(handler))?;
        self.config.subscriptions_mut().insert(SubscriptionKind::Callback, topic);
        Ok(self)
    }

    /// Handle every EVENT envelope. Replaces any earlier catch-all.
    #[must_use]
    pub fn register_catch_all(mut self, handler: impl EventHandler + 'static) -> Self {
        self.registry.set_catch_all(Box::new(handler));
        self
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Negotiate an endpoint, then hand the connection to a background task.
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] for an invalid config, otherwise whatever the
    /// first negotiation returns ([`ClientError::Auth`] or
    /// [`ClientError::Negotiation`]). Later failures show up in
    /// [`ClientHandle::status`] instead.
    pub async fn connect(mut self) -> Result<ClientHandle, ClientError> {
        self.config.validate()?;
        let mut lifecycle = Lifecycle::new(self.config.auto_reconnect);
        lifecycle.begin_negotiation();
        info!(client_id = %self.config.client_id, subscriptions = self.config.subscriptions().len(), "connecting");

        let negotiated = match self.negotiator.negotiate(&mut self.config).await {
            Ok(negotiated) => negotiated,
            Err(e) => {
                error!(error = %e, code = e.error_code(), "negotiation failed");
                return Err(e);
            }
        };

        let (commands, inbox) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(lifecycle.status().clone());
        let replier = Replier::new(commands.clone());
        let dispatcher = Dispatcher::new(self.registry, replier.clone());
        let task = ConnectionTask::new(self.config, self.negotiator, dispatcher, lifecycle, inbox, status_tx);
        tokio::spawn(task.run(negotiated));

        Ok(ClientHandle { commands, replier, status })
    }
}

impl fmt::Debug for DwClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DwClient").field("config", &self.config).field("registry", &self.registry).finish_non_exhaustive()
    }
}

/// Handle to a running client. Clones share the same connection.
///
/// Dropping every handle does not stop the connection; call
/// [`ClientHandle::disconnect`].
#[derive(Clone, Debug)]
pub struct ClientHandle {
    commands: mpsc::UnboundedSender<Command>,
    replier: Replier,
    status: watch::Receiver<ConnectionStatus>,
}

impl ClientHandle {
    /// Close the transport and suppress reconnect. Idempotent.
    pub fn disconnect(&self) {
        if self.commands.send(Command::Disconnect).is_err() {
            debug!("disconnect after connection task ended");
        }
    }

    /// Acknowledge a callback. See [`Replier::reply`].
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] for an empty message id or an unserializable
    /// payload.
    pub fn reply<T: Serialize + ?Sized>(&self, message_id: &str, payload: &T) -> Result<(), ClientError> {
        self.replier.reply(message_id, payload)
    }

    /// Acknowledge a graph API invocation.
    ///
    /// # Errors
    ///
    /// Same as [`ClientHandle::reply`].
    pub fn reply_graph_api(&self, message_id: &str, response: &GraphApiResponse) -> Result<(), ClientError> {
        self.replier.reply_graph_api(message_id, response)
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    #[must_use]
    pub fn connected(&self) -> bool {
        self.status.borrow().connected
    }

    #[must_use]
    pub fn registered(&self) -> bool {
        self.status.borrow().registered
    }

    #[must_use]
    pub fn reconnecting(&self) -> bool {
        self.status.borrow().reconnecting
    }

    /// Token from the most recent negotiation.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.status.borrow().access_token.clone()
    }

    /// Status change notifications.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Resolves once the client reaches CLOSED.
    pub async fn closed(&self) {
        let mut status = self.status.clone();
        if status.wait_for(|s| s.state == ConnectionState::Closed).await.is_err() {
            debug!("connection task ended");
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
