//! Stream-mode gateway client.
//!
//! DESIGN
//! ======
//! A client exchanges its app credentials for an access token, asks the
//! gateway for a WebSocket endpoint plus a single-use ticket, and then keeps
//! one persistent connection open. Inbound envelopes are routed by type:
//! SYSTEM control messages drive the lifecycle, EVENT envelopes go to one
//! catch-all handler and are acknowledged automatically, and CALLBACK
//! envelopes go to per-topic handlers that acknowledge themselves.
//!
//! ```no_run
//! use dwstream::{ClientConfig, DownstreamEnvelope, DwClient, Replier, TOPIC_ROBOT};
//!
//! # async fn run() -> Result<(), dwstream::ClientError> {
//! let config = ClientConfig::from_env()?;
//! let handle = DwClient::new(config)
//!     .register_topic(TOPIC_ROBOT, |env: DownstreamEnvelope, replier: Replier| async move {
//!         if let Err(e) = replier.reply(env.message_id(), &serde_json::json!({})) {
//!             tracing::warn!(error = %e, "ack failed");
//!         }
//!     })?
//!     .connect()
//!     .await?;
//! handle.closed().await;
//! # Ok(())
//! # }
//! ```

pub mod ack;
pub mod client;
mod connection;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod heartbeat;
pub mod negotiate;
pub mod reconnect;
pub mod registry;
pub mod state;

pub use ack::Replier;
pub use client::{ClientHandle, DwClient};
pub use config::{ClientConfig, Subscription, SubscriptionKind, Subscriptions};
pub use envelope::{
    DownstreamEnvelope, EnvelopeType, EventAck, EventAckData, GraphApiResponse, Headers, TOPIC_AI_GRAPH_API,
    TOPIC_ALL_EVENTS, TOPIC_CARD, TOPIC_ROBOT, UpstreamEnvelope,
};
pub use error::{ClientError, ErrorCode};
pub use negotiate::{HttpNegotiator, Negotiate, Negotiated};
pub use reconnect::ReconnectPolicy;
pub use registry::{CallbackHandler, EventHandler};
pub use state::{ConnectionState, ConnectionStatus};
