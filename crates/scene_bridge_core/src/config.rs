use crate::retry::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HTTP_ENDPOINT: &str = "http://127.0.0.1:7777";
pub const DEFAULT_ZMQ_ENDPOINT: &str = "tcp://127.0.0.1:5555";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_RETRIES: u32 = 5;
const DEFAULT_PING_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Endpoint and timing configuration, built once and handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Base URL of the host's HTTP bridge; `/execute`, `/console` and
    /// `/hierarchy` hang off it.
    pub http_endpoint: String,
    pub zmq_endpoint: String,
    /// Per-attempt bound: HTTP request timeout, ZeroMQ connect timeout.
    pub timeout: Duration,
    pub probe_timeout: Duration,
    pub retry: RetryPolicy,
    /// Liveness checks use their own, smaller bound.
    pub ping: RetryPolicy,
    pub focus_script: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            http_endpoint: DEFAULT_HTTP_ENDPOINT.to_string(),
            zmq_endpoint: DEFAULT_ZMQ_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            retry: RetryPolicy::new(DEFAULT_RETRIES, DEFAULT_RETRY_DELAY),
            ping: RetryPolicy::new(DEFAULT_PING_RETRIES, DEFAULT_RETRY_DELAY),
            focus_script: None,
        }
    }
}

impl BridgeConfig {
    pub fn new(http_endpoint: impl Into<String>, zmq_endpoint: impl Into<String>) -> Self {
        Self {
            http_endpoint: http_endpoint.into(),
            zmq_endpoint: zmq_endpoint.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Missing or unparseable
    /// values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let millis = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
        };
        let count = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u32>().ok());

        let retry_delay = millis("SCENE_BRIDGE_RETRY_DELAY_MS").unwrap_or(defaults.retry.delay);

        Self {
            http_endpoint: lookup("SCENE_BRIDGE_HTTP_ENDPOINT")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.http_endpoint),
            zmq_endpoint: lookup("SCENE_BRIDGE_ZMQ_ENDPOINT").unwrap_or(defaults.zmq_endpoint),
            timeout: millis("SCENE_BRIDGE_TIMEOUT_MS").unwrap_or(defaults.timeout),
            probe_timeout: millis("SCENE_BRIDGE_PROBE_TIMEOUT_MS").unwrap_or(defaults.probe_timeout),
            retry: RetryPolicy::new(
                count("SCENE_BRIDGE_RETRIES").unwrap_or(defaults.retry.attempts),
                retry_delay,
            ),
            ping: RetryPolicy::new(
                count("SCENE_BRIDGE_PING_RETRIES").unwrap_or(defaults.ping.attempts),
                retry_delay,
            ),
            focus_script: lookup("SCENE_BRIDGE_FOCUS_SCRIPT")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_ping(mut self, ping: RetryPolicy) -> Self {
        self.ping = ping;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.http_endpoint, "http://127.0.0.1:7777");
        assert_eq!(config.zmq_endpoint, "tcp://127.0.0.1:5555");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.retry, RetryPolicy::new(5, Duration::from_secs(1)));
        assert_eq!(config.ping.attempts, 2);
        assert!(config.focus_script.is_none());
    }

    #[test]
    fn test_new_config() {
        let config = BridgeConfig::new("http://localhost:8080", "tcp://localhost:6000");
        assert_eq!(config.http_endpoint, "http://localhost:8080");
        assert_eq!(config.zmq_endpoint, "tcp://localhost:6000");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = BridgeConfig::from_lookup(|_| None);
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_from_lookup_custom() {
        let config = BridgeConfig::from_lookup(lookup_from(&[
            ("SCENE_BRIDGE_HTTP_ENDPOINT", "http://custom:9999/"),
            ("SCENE_BRIDGE_ZMQ_ENDPOINT", "tcp://custom:5556"),
            ("SCENE_BRIDGE_TIMEOUT_MS", "5000"),
            ("SCENE_BRIDGE_RETRIES", "3"),
            ("SCENE_BRIDGE_PING_RETRIES", "1"),
            ("SCENE_BRIDGE_RETRY_DELAY_MS", "250"),
            ("SCENE_BRIDGE_FOCUS_SCRIPT", "focus_host.ps1"),
        ]));

        assert_eq!(config.http_endpoint, "http://custom:9999");
        assert_eq!(config.zmq_endpoint, "tcp://custom:5556");
        assert_eq!(config.timeout, Duration::from_millis(5000));
        assert_eq!(config.retry, RetryPolicy::new(3, Duration::from_millis(250)));
        assert_eq!(config.ping, RetryPolicy::new(1, Duration::from_millis(250)));
        assert_eq!(config.focus_script, Some(PathBuf::from("focus_host.ps1")));
    }

    #[test]
    fn test_from_lookup_ignores_garbage() {
        let config = BridgeConfig::from_lookup(lookup_from(&[
            ("SCENE_BRIDGE_TIMEOUT_MS", "soon"),
            ("SCENE_BRIDGE_RETRIES", "-2"),
            ("SCENE_BRIDGE_FOCUS_SCRIPT", "  "),
        ]));

        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.retry.attempts, DEFAULT_RETRIES);
        assert!(config.focus_script.is_none());
    }
}
