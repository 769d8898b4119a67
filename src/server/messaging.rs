use super::RelayServer;
use crate::coordinator::{Delivery, RelayError};
use crate::protocol::{ErrorCode, ServerMessage, SessionId};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;

impl RelayServer {
    /// Perform coordinator deliveries. Never blocks: a full outbound queue drops the envelope.
    /// Callers holding the coordinator lock keep per-session order consistent with dispatch order.
    pub(crate) fn deliver(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            match delivery {
                Delivery::Send { to, message } => {
                    let Some(handle) = self.connection_manager.get(to) else {
                        tracing::debug!(session_id = %to, "Dropping envelope for departed session");
                        continue;
                    };
                    match handle.sender.try_send(Arc::clone(&message)) {
                        Ok(()) => self.metrics.increment_envelopes_delivered(),
                        Err(TrySendError::Full(_)) => {
                            self.metrics.increment_envelopes_dropped();
                            tracing::warn!(session_id = %to, "Outbound queue full, envelope dropped");
                        }
                        Err(TrySendError::Closed(_)) => {
                            tracing::debug!(session_id = %to, "Outbound queue closed");
                        }
                    }
                }
                Delivery::Close { session } => {
                    if let Some(handle) = self.connection_manager.get(session) {
                        tracing::info!(session_id = %session, "Closing connection");
                        handle.shutdown.cancel();
                    }
                }
            }
        }
    }

    /// Report an error raised outside the coordinator, e.g. by the transport layer.
    pub fn send_error(&self, session: SessionId, code: ErrorCode, message: impl Into<String>) {
        self.metrics.increment_client_errors();
        self.deliver(vec![Delivery::Send {
            to: session,
            message: Arc::new(ServerMessage::error(code, message)),
        }]);
    }

    pub fn send_relay_error(&self, session: SessionId, error: &RelayError) {
        self.send_error(session, error.code(), error.to_string());
    }
}
