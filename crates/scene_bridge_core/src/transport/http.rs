use super::Transport;
use crate::focus::{self, FocusHook, NoFocus};
use crate::retry::{retry, RetryPolicy};
use crate::types::{ActionKind, Command, Hierarchy, Reply};
use crate::{BridgeConfig, Result, TransportError};
use reqwest::StatusCode;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// JSON over HTTP: `POST {endpoint}/execute`, plus the read-only
/// `/`, `/console` and `/hierarchy` endpoints.
#[derive(Clone)]
pub struct HttpTransport {
    config: BridgeConfig,
    http_client: reqwest::Client,
    focus: Arc<dyn FocusHook>,
}

impl HttpTransport {
    pub fn new(config: BridgeConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            config,
            http_client,
            focus: Arc::new(NoFocus),
        })
    }

    pub fn with_focus(mut self, focus: Arc<dyn FocusHook>) -> Self {
        self.focus = focus;
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.http_endpoint.trim_end_matches('/'), path)
    }

    /// `GET /`: single attempt with the short probe timeout. Returns the
    /// host's banner text.
    pub async fn probe(&self) -> Result<String> {
        let url = &self.url("");
        let timeout = Some(self.config.probe_timeout);
        let this = self;
        retry(RetryPolicy::once(), move |_| this.get_text(url, timeout)).await
    }

    /// `GET /console`: whatever log text the host has accumulated, verbatim.
    pub async fn console(&self) -> Result<String> {
        let url = &self.url("console");
        let timeout = Some(self.config.probe_timeout);
        let this = self;
        retry(RetryPolicy::once(), move |_| this.get_text(url, timeout)).await
    }

    /// `GET /hierarchy`, after a focus nudge so the host refreshes its tree.
    pub async fn hierarchy(&self) -> Result<Hierarchy> {
        focus::nudge(&self.focus).await;

        let url = &self.url("hierarchy");
        let this = self;
        let body = retry(RetryPolicy::once(), move |_| this.get_text(url, None)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_text(&self, url: &str, timeout: Option<Duration>) -> Result<String> {
        tracing::debug!("GET {}", url);

        let mut request = self.http_client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(TransportError::from_http)?;
        let status = response.status();
        let body = response.text().await.map_err(TransportError::from_http)?;

        if status != StatusCode::OK {
            return Err(TransportError::rejected(status.as_u16(), body));
        }
        Ok(body)
    }

    async fn post_once(&self, command: &Command, attempt: u32) -> Result<Reply> {
        focus::nudge(&self.focus).await;

        tracing::debug!(
            "Sending command: action={}, attempt={}",
            command.action(),
            attempt
        );

        let response = self
            .http_client
            .post(self.url("execute"))
            .json(command)
            .send()
            .await
            .map_err(TransportError::from_http)?;

        let status = response.status();
        let body = response.text().await.map_err(TransportError::from_http)?;

        if status != StatusCode::OK {
            tracing::warn!(
                "Command rejected: action={}, status={}, body={}",
                command.action(),
                status,
                body
            );
            return Err(TransportError::rejected(status.as_u16(), body));
        }

        Ok(parse_reply(command, body))
    }
}

/// `ping` answers are opaque text. Anything else should be a JSON [`Reply`];
/// a 200 body that isn't one is kept verbatim as the message.
fn parse_reply(command: &Command, body: String) -> Reply {
    if command.action() == ActionKind::Ping {
        return Reply::ok(body);
    }

    match serde_json::from_str::<Reply>(&body) {
        Ok(reply) => {
            if !reply.is_ok() {
                tracing::warn!(
                    "Host reported error for action={}: {}",
                    command.action(),
                    reply.message
                );
            }
            reply
        }
        Err(e) => {
            tracing::debug!("Unstructured reply body ({}), keeping it as text", e);
            Reply::ok(body)
        }
    }
}

impl Transport for HttpTransport {
    fn retry_policy(&self) -> RetryPolicy {
        self.config.retry
    }

    async fn dispatch_with(&mut self, command: &Command, policy: RetryPolicy) -> Result<Reply> {
        command.validate()?;
        let this = &*self;
        retry(policy, move |attempt| this.post_once(command, attempt)).await
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
