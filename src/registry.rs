//! Topic → handler bindings.
//!
//! CALLBACK envelopes route by exact topic to one handler each. EVENT
//! envelopes all go to a single catch-all. Async closures implement both
//! handler traits, so most callers never name them.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use envelope::{DownstreamEnvelope, EventAckData};

use crate::ack::Replier;
use crate::error::ClientError;

/// Handles CALLBACK envelopes for one topic. Acknowledging is up to the
/// handler, through the supplied [`Replier`].
#[async_trait]
pub trait CallbackHandler: Send + Sync {
    async fn on_callback(&self, envelope: DownstreamEnvelope, replier: Replier);
}

#[async_trait]
impl<F, Fut> CallbackHandler for F
where
    F: Fn(DownstreamEnvelope, Replier) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_callback(&self, envelope: DownstreamEnvelope, replier: Replier) {
        (self)(envelope, replier).await;
    }
}

/// Handles every EVENT envelope. The returned status is sent as the ack.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_event(&self, envelope: DownstreamEnvelope) -> EventAckData;
}

#[async_trait]
impl<F, Fut> EventHandler for F
where
    F: Fn(DownstreamEnvelope) -> Fut + Send + Sync,
    Fut: Future<Output = EventAckData> + Send + 'static,
{
    async fn on_event(&self, envelope: DownstreamEnvelope) -> EventAckData {
        (self)(envelope).await
    }
}

#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<String, Box<dyn CallbackHandler>>,
    catch_all: Option<Box<dyn EventHandler>>,
}

impl CallbackRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `topic`.
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] for an empty topic and
    /// [`ClientError::DuplicateTopic`] if the topic is already bound.
    pub fn bind(&mut self, topic: &str, handler: Box<dyn CallbackHandler>) -> Result<(), ClientError> {
        if topic.is_empty() {
            return Err(ClientError::Config("callback topic is empty".into()));
        }
        if self.callbacks.contains_key(topic) {
            return Err(ClientError::DuplicateTopic { topic: topic.to_owned() });
        }
        self.callbacks.insert(topic.to_owned(), handler);
        Ok(())
    }

    /// Replace the EVENT handler.
    pub fn set_catch_all(&mut self, handler: Box<dyn EventHandler>) {
        self.catch_all = Some(handler);
    }

    #[must_use]
    pub fn callback(&self, topic: &str) -> Option<&dyn CallbackHandler> {
        self.callbacks.get(topic).map(|h| &**h)
    }

    #[must_use]
    pub fn catch_all(&self) -> Option<&dyn EventHandler> {
        self.catch_all.as_deref()
    }

    #[must_use]
    pub fn contains(&self, topic: &str) -> bool {
        self.callbacks.contains_key(topic)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut topics: Vec<&str> = self.callbacks.keys().map(String::as_str).collect();
        topics.sort_unstable();
        f.debug_struct("CallbackRegistry")
            .field("topics", &topics)
            .field("catch_all", &self.catch_all.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
