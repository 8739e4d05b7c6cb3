//! Client configuration and the subscription list.
//!
//! DESIGN
//! ======
//! `ClientConfig` is owned by one client and moved into its connection task
//! at connect time. Negotiation writes the runtime fields (`access_token`,
//! `endpoint`, `ticket`); nothing else mutates it after connect.
//!
//! The subscription list is ordered, never holds a duplicate (type, topic)
//! pair, and always starts with the wildcard EVENT subscription.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::reconnect::ReconnectPolicy;

pub const DEFAULT_TOKEN_URL: &str = "https://oapi.dingtalk.com/gettoken";
pub const DEFAULT_GATEWAY_URL: &str = "https://api.dingtalk.com/v1.0/gateway/connections/open";
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 8000;
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;

// =============================================================================
// SUBSCRIPTIONS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubscriptionKind {
    Event,
    Callback,
}

/// One entry of the list sent to the gateway during negotiation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "type")]
    pub kind: SubscriptionKind,
    pub topic: String,
}

/// Ordered, duplicate-free subscription list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Subscriptions(Vec<Subscription>);

impl Default for Subscriptions {
    fn default() -> Self {
        Self(vec![Subscription {
            kind: SubscriptionKind::Event,
            topic: envelope::TOPIC_ALL_EVENTS.to_owned(),
        }])
    }
}

impl Subscriptions {
    /// Append `(kind, topic)` unless already present. Returns `true` if added.
    pub fn insert(&mut self, kind: SubscriptionKind, topic: impl Into<String>) -> bool {
        let topic = topic.into();
        if self.contains(kind, &topic) {
            return false;
        }
        self.0.push(Subscription { kind, topic });
        true
    }

    #[must_use]
    pub fn contains(&self, kind: SubscriptionKind, topic: &str) -> bool {
        self.0.iter().any(|s| s.kind == kind && s.topic == topic)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// CLIENT CONFIG
// =============================================================================

#[derive(Clone)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    /// User-agent string reported to the gateway.
    pub ua: String,
    pub auto_reconnect: bool,
    /// Enables the client-side heartbeat monitor.
    pub keep_alive: bool,
    pub heartbeat_interval: Duration,
    pub reconnect: ReconnectPolicy,
    /// Per-request timeout for the two negotiation calls.
    pub http_timeout: Duration,
    pub token_url: String,
    pub gateway_url: String,
    subscriptions: Subscriptions,

    /// Set by negotiation.
    pub access_token: Option<String>,
    /// Set by negotiation.
    pub endpoint: Option<String>,
    /// Set by negotiation. Single-use.
    pub ticket: Option<String>,
}

impl ClientConfig {
    /// Build a config with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if either credential is empty.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self, ClientError> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(ClientError::Config("client id or client secret is empty".into()));
        }

        Ok(Self {
            client_id,
            client_secret,
            ua: String::new(),
            auto_reconnect: true,
            keep_alive: false,
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL_MS),
            reconnect: ReconnectPolicy::default(),
            http_timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
            token_url: DEFAULT_TOKEN_URL.to_owned(),
            gateway_url: DEFAULT_GATEWAY_URL.to_owned(),
            subscriptions: Subscriptions::default(),
            access_token: None,
            endpoint: None,
            ticket: None,
        })
    }

    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `DW_CLIENT_ID`
    /// - `DW_CLIENT_SECRET`
    ///
    /// Optional:
    /// - `DW_UA`: default empty
    /// - `DW_KEEP_ALIVE`: default `false`
    /// - `DW_AUTO_RECONNECT`: default `true`
    /// - `DW_HEARTBEAT_INTERVAL_MS`: default 8000
    /// - `DW_RECONNECT_INTERVAL_MS`: default 1000 (fixed delay)
    /// - `DW_HTTP_TIMEOUT_MS`: default 5000
    /// - `DW_TOKEN_URL`, `DW_GATEWAY_URL`: production gateway by default
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if a credential is missing or empty.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if a credential is missing or empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let client_id =
            lookup("DW_CLIENT_ID").ok_or_else(|| ClientError::Config("DW_CLIENT_ID not set".into()))?;
        let client_secret =
            lookup("DW_CLIENT_SECRET").ok_or_else(|| ClientError::Config("DW_CLIENT_SECRET not set".into()))?;

        let mut config = Self::new(client_id, client_secret)?;
        if let Some(ua) = lookup("DW_UA") {
            config.ua = ua;
        }
        config.keep_alive = parse_or(lookup("DW_KEEP_ALIVE"), false);
        config.auto_reconnect = parse_or(lookup("DW_AUTO_RECONNECT"), true);
        let heartbeat_ms = parse_or(lookup("DW_HEARTBEAT_INTERVAL_MS"), DEFAULT_HEARTBEAT_INTERVAL_MS);
        if heartbeat_ms == 0 {
            return Err(ClientError::Config("DW_HEARTBEAT_INTERVAL_MS must be positive".into()));
        }
        config.heartbeat_interval = Duration::from_millis(heartbeat_ms);
        config.reconnect = ReconnectPolicy::Fixed(Duration::from_millis(parse_or(
            lookup("DW_RECONNECT_INTERVAL_MS"),
            DEFAULT_RECONNECT_INTERVAL_MS,
        )));
        config.http_timeout = Duration::from_millis(parse_or(lookup("DW_HTTP_TIMEOUT_MS"), DEFAULT_HTTP_TIMEOUT_MS));
        if let Some(url) = lookup("DW_TOKEN_URL") {
            config.token_url = url;
        }
        if let Some(url) = lookup("DW_GATEWAY_URL") {
            config.gateway_url = url;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_ua(mut self, ua: impl Into<String>) -> Self {
        self.ua = ua.into();
        self
    }

    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    #[must_use]
    pub fn with_auto_reconnect(mut self, auto_reconnect: bool) -> Self {
        self.auto_reconnect = auto_reconnect;
        self
    }

    /// # Errors
    ///
    /// [`ClientError::Config`] for a zero interval.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Result<Self, ClientError> {
        if interval.is_zero() {
            return Err(ClientError::Config("heartbeat interval must be positive".into()));
        }
        self.heartbeat_interval = interval;
        Ok(self)
    }

    #[must_use]
    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Point negotiation at a different token and gateway (staging, tests).
    #[must_use]
    pub fn with_urls(mut self, token_url: impl Into<String>, gateway_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.gateway_url = gateway_url.into();
        self
    }

    #[must_use]
    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    pub(crate) fn subscriptions_mut(&mut self) -> &mut Subscriptions {
        &mut self.subscriptions
    }

    /// Checks fields that may have been set directly.
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] for a zero heartbeat interval.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.heartbeat_interval.is_zero() {
            return Err(ClientError::Config("heartbeat interval must be positive".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("ua", &self.ua)
            .field("auto_reconnect", &self.auto_reconnect)
            .field("keep_alive", &self.keep_alive)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("reconnect", &self.reconnect)
            .field("token_url", &self.token_url)
            .field("gateway_url", &self.gateway_url)
            .field("subscriptions", &self.subscriptions)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Parse an optional raw value, falling back to `default` when absent or invalid.
fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
