//! Endpoint negotiation: credentials → access token → endpoint + ticket.
//!
//! Two HTTP round trips per connect cycle. Tickets are single-use, so every
//! reconnect negotiates again from scratch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ClientConfig, Subscriptions};
use crate::error::ClientError;

/// Result of a successful negotiation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Negotiated {
    pub access_token: String,
    pub endpoint: String,
    pub ticket: String,
}

impl Negotiated {
    /// Transport URL carrying the ticket.
    #[must_use]
    pub fn connect_url(&self) -> String {
        format!("{}?ticket={}", self.endpoint, self.ticket)
    }
}

/// Obtains a fresh endpoint and ticket for one connect cycle.
#[async_trait]
pub trait Negotiate: Send + Sync {
    /// Writes `access_token`, then `endpoint` and `ticket`, into `config`
    /// as each step succeeds.
    ///
    /// # Errors
    ///
    /// [`ClientError::Auth`] when the token step fails and
    /// [`ClientError::Negotiation`] when the gateway step fails.
    async fn negotiate(&self, config: &mut ClientConfig) -> Result<Negotiated, ClientError>;
}

/// Production negotiator talking to the token and gateway HTTP APIs.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpNegotiator;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct OpenResponse {
    #[serde(default)]
    endpoint: String,
    #[serde(default)]
    ticket: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    ua: &'a str,
    subscriptions: &'a Subscriptions,
}

#[async_trait]
impl Negotiate for HttpNegotiator {
    async fn negotiate(&self, config: &mut ClientConfig) -> Result<Negotiated, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ClientError::Auth(http_error(e)))?;

        debug!(url = %config.token_url, "requesting access token");
        let resp = http
            .get(&config.token_url)
            .query(&[("appkey", config.client_id.as_str()), ("appsecret", config.client_secret.as_str())])
            .send()
            .await
            .map_err(|e| ClientError::Auth(http_error(e)))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| ClientError::Auth(http_error(e)))?;
        let access_token = parse_token_response(status, &body)?;
        config.access_token = Some(access_token.clone());

        debug!(url = %config.gateway_url, subscriptions = config.subscriptions().len(), "opening gateway connection");
        let resp = http
            .post(&config.gateway_url)
            .header("Accept", "application/json")
            .header("access-token", access_token.as_str())
            .json(&OpenRequest {
                client_id: &config.client_id,
                client_secret: &config.client_secret,
                ua: &config.ua,
                subscriptions: config.subscriptions(),
            })
            .send()
            .await
            .map_err(|e| ClientError::Negotiation(http_error(e)))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| ClientError::Negotiation(http_error(e)))?;
        let (endpoint, ticket) = parse_open_response(status, &body)?;
        config.endpoint = Some(endpoint.clone());
        config.ticket = Some(ticket.clone());

        info!(%endpoint, "endpoint negotiated");
        Ok(Negotiated { access_token, endpoint, ticket })
    }
}

/// Error text without the request URL, whose query carries the app secret.
fn http_error(e: reqwest::Error) -> String {
    e.without_url().to_string()
}

/// Extract the access token from the token API response.
///
/// # Errors
///
/// [`ClientError::Auth`] unless the status is 200 and the body carries a
/// non-empty `access_token`.
pub fn parse_token_response(status: u16, body: &str) -> Result<String, ClientError> {
    if status != 200 {
        return Err(ClientError::Auth(format!("token endpoint returned {status}: {body}")));
    }
    let parsed: TokenResponse =
        serde_json::from_str(body).map_err(|_| ClientError::Auth(format!("unexpected token response: {body}")))?;
    if parsed.access_token.is_empty() {
        return Err(ClientError::Auth("access_token missing from token response".into()));
    }
    Ok(parsed.access_token)
}

/// Extract `(endpoint, ticket)` from the gateway open response.
///
/// # Errors
///
/// [`ClientError::Negotiation`] on a non-success status, an unparsable body,
/// or an empty endpoint or ticket.
pub fn parse_open_response(status: u16, body: &str) -> Result<(String, String), ClientError> {
    if !(200..300).contains(&status) {
        return Err(ClientError::Negotiation(format!("gateway returned {status}: {body}")));
    }
    let parsed: OpenResponse = serde_json::from_str(body)
        .map_err(|_| ClientError::Negotiation(format!("unexpected gateway response: {body}")))?;
    if parsed.endpoint.is_empty() || parsed.ticket.is_empty() {
        return Err(ClientError::Negotiation("endpoint or ticket is empty".into()));
    }
    Ok((parsed.endpoint, parsed.ticket))
}

#[cfg(test)]
#[path = "negotiate_test.rs"]
mod tests;
