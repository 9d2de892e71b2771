use crate::retry::RetryPolicy;
use crate::transport::Transport;
use crate::types::Command;
use crate::{BridgeConfig, Result};

/// Liveness check: a `ping` under a short retry bound of its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthMonitor {
    policy: RetryPolicy,
}

impl HealthMonitor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.ping)
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// `true` once the host answers a ping at all, even with an error status.
    pub async fn check_connection<T: Transport>(&self, transport: &mut T) -> bool {
        self.ping(transport).await.is_ok()
    }

    /// Like [`HealthMonitor::check_connection`] but hands back the failure.
    /// Callers treat an error here as fatal.
    pub async fn ensure_initialized<T: Transport>(&self, transport: &mut T) -> Result<()> {
        self.ping(transport).await
    }

    async fn ping<T: Transport>(&self, transport: &mut T) -> Result<()> {
        match transport.dispatch_with(&Command::Ping, self.policy).await {
            Ok(reply) => {
                tracing::info!("Host is up: {}", reply.message);
                Ok(())
            }
            Err(e) => {
                tracing::info!("Host is down: {}", e);
                Err(e)
            }
        }
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::from_config(&BridgeConfig::default())
    }
}
