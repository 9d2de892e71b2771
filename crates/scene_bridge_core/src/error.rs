use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    /// A single failed connection attempt. Retried by the retry policy and
    /// folded into [`TransportError::Unreachable`] once the bound is spent.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Host unreachable after {attempts} attempt(s): {message}")]
    Unreachable { attempts: u32, message: String },

    #[error("Host rejected command (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl TransportError {
    pub fn unreachable(attempts: u32, message: impl Into<String>) -> Self {
        Self::Unreachable {
            attempts,
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Only connection-level failures are worth another attempt; everything
    /// else means the host (or the codec) already made a decision.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    pub(crate) fn from_http(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Connection(err.to_string())
        } else {
            Self::Protocol(err.to_string())
        }
    }
}

impl From<prost::DecodeError> for TransportError {
    fn from(err: prost::DecodeError) -> Self {
        Self::Protocol(format!("malformed binary message: {err}"))
    }
}
