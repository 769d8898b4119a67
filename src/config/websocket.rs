//! WebSocket configuration types.

use super::defaults::{default_auth_timeout_secs, default_outbound_queue_capacity};
use serde::{Deserialize, Serialize};

/// WebSocket configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebSocketConfig {
    /// Seconds a client has to send `authenticate` after connecting
    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,
    /// Envelopes buffered per session before new ones are dropped
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            auth_timeout_secs: default_auth_timeout_secs(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
        }
    }
}

impl WebSocketConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(5..=60).contains(&self.auth_timeout_secs) {
            anyhow::bail!(
                "websocket.auth_timeout_secs must be between 5 and 60 seconds (configured: {})",
                self.auth_timeout_secs
            );
        }
        if self.outbound_queue_capacity == 0 {
            anyhow::bail!("websocket.outbound_queue_capacity must be greater than zero");
        }
        Ok(())
    }
}
