//! The dispatch contract and its two wire implementations.

mod http;
pub mod wire;
mod zmq;

pub use http::HttpTransport;
pub use zmq::ZmqTransport;

use crate::retry::RetryPolicy;
use crate::types::{Command, Reply};
use crate::{Result, TransportError};
use std::time::Duration;

/// Sends one [`Command`] to the host and waits for its [`Reply`].
///
/// Methods take `&mut self`: a transport instance never has two requests in
/// flight. Implementations nudge the focus hook before every attempt.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// The bound used by [`Transport::dispatch`].
    fn retry_policy(&self) -> RetryPolicy;

    /// Dispatch under an explicit retry bound, e.g. the short bound of a
    /// liveness check.
    async fn dispatch_with(&mut self, command: &Command, policy: RetryPolicy) -> Result<Reply>;

    async fn dispatch(&mut self, command: &Command) -> Result<Reply> {
        let policy = self.retry_policy();
        self.dispatch_with(command, policy).await
    }

    /// Drop any per-connection state. Called after an in-flight dispatch was
    /// abandoned.
    fn reset(&mut self) {}
}

/// Bounds a dispatch by `deadline`. On expiry the transport is reset so the
/// next call starts from a clean connection.
pub async fn dispatch_with_deadline<T: Transport>(
    transport: &mut T,
    command: &Command,
    deadline: Duration,
) -> Result<Reply> {
    let outcome = tokio::time::timeout(deadline, transport.dispatch(command)).await;
    match outcome {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("Dispatch of '{}' exceeded {:?}", command.action(), deadline);
            transport.reset();
            Err(TransportError::Timeout(deadline))
        }
    }
}

/// Either transport, picked at runtime.
pub enum AnyTransport {
    Http(HttpTransport),
    Zmq(ZmqTransport),
}

impl From<HttpTransport> for AnyTransport {
    fn from(t: HttpTransport) -> Self {
        Self::Http(t)
    }
}

impl From<ZmqTransport> for AnyTransport {
    fn from(t: ZmqTransport) -> Self {
        Self::Zmq(t)
    }
}

impl Transport for AnyTransport {
    fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Http(t) => t.retry_policy(),
            Self::Zmq(t) => t.retry_policy(),
        }
    }

    async fn dispatch_with(&mut self, command: &Command, policy: RetryPolicy) -> Result<Reply> {
        match self {
            Self::Http(t) => t.dispatch_with(command, policy).await,
            Self::Zmq(t) => t.dispatch_with(command, policy).await,
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Http(t) => t.reset(),
            Self::Zmq(t) => t.reset(),
        }
    }
}
