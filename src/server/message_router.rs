use crate::coordinator::RelayError;
use crate::protocol::{ClientMessage, SessionId};
use crate::rate_limit::RateLimitedAction;

use super::RelayServer;

impl RelayServer {
    /// Handle one parsed inbound envelope.
    pub async fn handle_client_message(&self, session: SessionId, message: ClientMessage) {
        if let Some(action) = rate_limited_action(&message) {
            if let Err(err) = self.rate_limiter.check(session, action).await {
                tracing::warn!(
                    session_id = %session,
                    ?action,
                    retry_after_secs = err.retry_after().as_secs(),
                    "Rate limit exceeded"
                );
                self.metrics.increment_rate_limit_rejections();
                self.send_relay_error(session, &RelayError::RateLimitExceeded(err.to_string()));
                return;
            }
        }

        // Deliver under the lock so every member queue sees the dispatch order.
        let mut coordinator = self.coordinator.lock().await;
        let deliveries = coordinator.dispatch(session, message);
        self.deliver(deliveries);
    }
}

fn rate_limited_action(message: &ClientMessage) -> Option<RateLimitedAction> {
    match message {
        ClientMessage::CreateRoom { .. } => Some(RateLimitedAction::CreateRoom),
        ClientMessage::JoinRoom { .. } => Some(RateLimitedAction::JoinRequest),
        _ => None,
    }
}
