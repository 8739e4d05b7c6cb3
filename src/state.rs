//! Connection lifecycle state machine.
//!
//! DESIGN
//! ======
//! `Lifecycle` holds the pure transition rules; it never touches a socket or
//! a timer. The connection task feeds it transport events and gateway control
//! messages, then publishes `status()` to client handles.
//!
//! TRANSITIONS
//! ===========
//! INIT → NEGOTIATING → CONNECTING → OPEN → REGISTERED
//! OPEN | REGISTERED → (close) → RECONNECTING → NEGOTIATING …
//! any → (user disconnect or failed negotiation) → CLOSED
//!
//! A user disconnect is sticky: once requested, no close event may lead back
//! to RECONNECTING.

use std::fmt;

use crate::error::ClientError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Init,
    Negotiating,
    Connecting,
    Open,
    Registered,
    Reconnecting,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Init => "INIT",
            Self::Negotiating => "NEGOTIATING",
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Registered => "REGISTERED",
            Self::Reconnecting => "RECONNECTING",
            Self::Closed => "CLOSED",
        };
        f.write_str(label)
    }
}

/// Snapshot published to every client handle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Transport is open.
    pub connected: bool,
    /// Gateway confirmed registration on the current transport.
    pub registered: bool,
    /// A reconnect cycle is in progress.
    pub reconnecting: bool,
    /// Token from the most recent successful negotiation.
    pub access_token: Option<String>,
    pub endpoint: Option<String>,
    /// Text of the error that last ended a connect attempt.
    pub last_error: Option<String>,
}

/// Outcome of a transport close.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseDecision {
    /// Schedule reconnect attempt number `attempt` (zero-based).
    Reconnect { attempt: u32 },
    /// Stay closed.
    Stop,
}

#[derive(Debug)]
pub struct Lifecycle {
    status: ConnectionStatus,
    auto_reconnect: bool,
    user_disconnect: bool,
    attempt: u32,
}

impl Lifecycle {
    #[must_use]
    pub fn new(auto_reconnect: bool) -> Self {
        Self { status: ConnectionStatus::default(), auto_reconnect, user_disconnect: false, attempt: 0 }
    }

    #[must_use]
    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.status.state
    }

    #[must_use]
    pub fn disconnect_requested(&self) -> bool {
        self.user_disconnect
    }

    pub fn begin_negotiation(&mut self) {
        self.status.state = ConnectionState::Negotiating;
    }

    pub fn negotiated(&mut self, access_token: &str, endpoint: &str) {
        self.status.state = ConnectionState::Connecting;
        self.status.access_token = Some(access_token.to_owned());
        self.status.endpoint = Some(endpoint.to_owned());
        self.status.last_error = None;
    }

    /// Negotiation failures are fatal to the client: no reconnect follows.
    pub fn negotiation_failed(&mut self, err: &ClientError) {
        self.status.last_error = Some(err.to_string());
        self.shut_down();
    }

    pub fn opened(&mut self) {
        self.status.state = ConnectionState::Open;
        self.status.connected = true;
    }

    /// Gateway REGISTERED control message. Ignored without an open transport.
    pub fn registered(&mut self) {
        if !self.status.connected {
            return;
        }
        self.status.state = ConnectionState::Registered;
        self.status.registered = true;
        self.status.reconnecting = false;
        self.attempt = 0;
    }

    /// Gateway `disconnect` control message: flags drop before the close.
    pub fn server_disconnect(&mut self) {
        self.status.connected = false;
        self.status.registered = false;
    }

    /// Transport closed (or failed to open). Applies the reconnect policy.
    pub fn closed(&mut self, err: Option<&ClientError>) -> CloseDecision {
        self.status.connected = false;
        self.status.registered = false;
        if let Some(err) = err {
            self.status.last_error = Some(err.to_string());
        }

        if self.auto_reconnect && !self.user_disconnect {
            self.status.state = ConnectionState::Reconnecting;
            self.status.reconnecting = true;
            let attempt = self.attempt;
            self.attempt = self.attempt.saturating_add(1);
            CloseDecision::Reconnect { attempt }
        } else {
            self.shut_down();
            CloseDecision::Stop
        }
    }

    /// Explicit user disconnect. Terminal.
    pub fn request_disconnect(&mut self) {
        self.user_disconnect = true;
        self.shut_down();
    }

    fn shut_down(&mut self) {
        self.status.state = ConnectionState::Closed;
        self.status.connected = false;
        self.status.registered = false;
        self.status.reconnecting = false;
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
