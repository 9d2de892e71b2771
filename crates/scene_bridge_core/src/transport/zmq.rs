use super::{wire, Transport};
use crate::focus::{self, FocusHook, NoFocus};
use crate::retry::{retry, RetryPolicy};
use crate::types::{Command, Reply};
use crate::{BridgeConfig, Result, TransportError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use zeromq::{ReqSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

/// Protobuf frames over a ZeroMQ REQ socket.
///
/// The socket is connected on first use and kept between dispatches. The
/// exchange itself has no timeout; wrap calls in
/// [`super::dispatch_with_deadline`] when the host may stall.
pub struct ZmqTransport {
    endpoint: String,
    connect_timeout: Duration,
    retry: RetryPolicy,
    focus: Arc<dyn FocusHook>,
    socket: Option<ReqSocket>,
    pending: bool,
}

impl ZmqTransport {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            endpoint: config.zmq_endpoint.clone(),
            connect_timeout: config.timeout,
            retry: config.retry,
            focus: Arc::new(NoFocus),
            socket: None,
            pending: false,
        }
    }

    pub fn with_focus(mut self, focus: Arc<dyn FocusHook>) -> Self {
        self.focus = focus;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    async fn connect(&self, policy: RetryPolicy) -> Result<ReqSocket> {
        let endpoint = self.endpoint.as_str();
        let timeout = self.connect_timeout;
        let focus = &self.focus;

        let socket = retry(policy, move |_| connect_once(endpoint, timeout, focus)).await?;
        tracing::debug!("Connected REQ socket to {}", endpoint);
        Ok(socket)
    }
}

async fn connect_once(
    endpoint: &str,
    timeout: Duration,
    focus: &Arc<dyn FocusHook>,
) -> Result<ReqSocket> {
    focus::nudge(focus).await;

    let mut socket = ReqSocket::new();
    match tokio::time::timeout(timeout, socket.connect(endpoint)).await {
        Ok(Ok(())) => Ok(socket),
        Ok(Err(e)) => Err(TransportError::Connection(format!("{}: {}", endpoint, e))),
        Err(_) => Err(TransportError::Connection(format!(
            "{}: connect timed out after {:?}",
            endpoint, timeout
        ))),
    }
}

impl Transport for ZmqTransport {
    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    async fn dispatch_with(&mut self, command: &Command, policy: RetryPolicy) -> Result<Reply> {
        if self.pending {
            return Err(TransportError::Protocol(
                "previous exchange was abandoned mid-flight; reset the transport".into(),
            ));
        }

        let request = wire::encode_command(command)?;

        let mut socket = match self.socket.take() {
            Some(socket) => {
                focus::nudge(&self.focus).await;
                socket
            }
            None => self.connect(policy).await?,
        };

        tracing::debug!(
            "Sending command: action={}, bytes={}",
            command.action(),
            request.len()
        );

        // Cleared only once a reply frame arrives. A cancelled future drops
        // the socket and leaves this set.
        self.pending = true;

        if let Err(e) = socket.send(ZmqMessage::from(request)).await {
            self.pending = false;
            return Err(TransportError::Connection(format!("send failed: {}", e)));
        }

        let response = match socket.recv().await {
            Ok(response) => response,
            Err(e) => {
                self.pending = false;
                return Err(TransportError::Connection(format!("receive failed: {}", e)));
            }
        };

        self.pending = false;
        self.socket = Some(socket);

        let frame = response
            .get(0)
            .ok_or_else(|| TransportError::Protocol("empty reply message".into()))?;
        let reply = wire::decode_reply(frame)?;

        if !reply.is_ok() {
            tracing::warn!(
                "Host reported error for action={}: {}",
                command.action(),
                reply.message
            );
        }
        Ok(reply)
    }

    fn reset(&mut self) {
        self.socket = None;
        self.pending = false;
    }
}

impl fmt::Debug for ZmqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZmqTransport")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.socket.is_some())
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
