//! Client error taxonomy.
//!
//! Every failure the client surfaces is a [`ClientError`]. Variants map onto
//! recovery policy: configuration problems are fatal at the call site,
//! negotiation failures go back to the caller, protocol errors are logged and
//! the frame dropped, and transport errors are logged while the close path
//! decides whether to reconnect.

/// Grepable error code and retryable flag for structured logging.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Errors produced by the stream client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Missing credentials, an empty message id, or another caller mistake.
    #[error("config error: {0}")]
    Config(String),

    /// A handler is already bound to this callback topic.
    #[error("callback topic already registered: {topic}")]
    DuplicateTopic { topic: String },

    /// The access token could not be obtained.
    #[error("auth failed: {0}")]
    Auth(String),

    /// The gateway did not hand out an endpoint and ticket.
    #[error("endpoint negotiation failed: {0}")]
    Negotiation(String),

    /// An inbound frame could not be understood.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The socket failed to open, read, or write.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ErrorCode for ClientError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "E_CONFIG",
            Self::DuplicateTopic { .. } => "E_DUPLICATE_TOPIC",
            Self::Auth(_) => "E_AUTH",
            Self::Negotiation(_) => "E_NEGOTIATION",
            Self::Protocol(_) => "E_PROTOCOL",
            Self::Transport(_) => "E_TRANSPORT",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Negotiation(_) | Self::Transport(_))
    }
}

impl From<envelope::CodecError> for ClientError {
    fn from(err: envelope::CodecError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
