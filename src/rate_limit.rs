use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

use crate::config::RateLimitConfig;
use crate::protocol::SessionId;

/// Limits applied to each session within one fixed window.
#[derive(Debug, Clone)]
pub struct RateLimits {
    pub max_room_creations: u32,
    pub max_join_requests: u32,
    pub time_window: Duration,
}

impl From<&RateLimitConfig> for RateLimits {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            max_room_creations: config.max_room_creations,
            max_join_requests: config.max_join_requests,
            time_window: Duration::from_secs(config.time_window),
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

/// Counters for one session's current window
#[derive(Debug, Clone)]
struct RateLimitEntry {
    room_creations: u32,
    join_requests: u32,
    window_start: Instant,
}

impl RateLimitEntry {
    fn new() -> Self {
        Self {
            room_creations: 0,
            join_requests: 0,
            window_start: Instant::now(),
        }
    }

    fn maybe_reset_window(&mut self, limits: &RateLimits) {
        if self.window_start.elapsed() >= limits.time_window {
            self.room_creations = 0;
            self.join_requests = 0;
            self.window_start = Instant::now();
        }
    }

    fn time_until_reset(&self, limits: &RateLimits) -> Duration {
        limits.time_window.saturating_sub(self.window_start.elapsed())
    }
}

/// Which budget an operation draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitedAction {
    CreateRoom,
    JoinRequest,
}

/// Per-session fixed-window limiter for room creations and join requests.
pub struct RoomRateLimiter {
    limits: RateLimits,
    entries: Arc<RwLock<HashMap<SessionId, RateLimitEntry>>>,
}

impl RoomRateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Consume one unit of the session's budget for `action`.
    pub async fn check(
        &self,
        session: SessionId,
        action: RateLimitedAction,
    ) -> Result<(), RateLimitError> {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(session).or_insert_with(RateLimitEntry::new);
        entry.maybe_reset_window(&self.limits);

        let (used, max) = match action {
            RateLimitedAction::CreateRoom => {
                (&mut entry.room_creations, self.limits.max_room_creations)
            }
            RateLimitedAction::JoinRequest => {
                (&mut entry.join_requests, self.limits.max_join_requests)
            }
        };

        if *used < max {
            *used += 1;
            return Ok(());
        }

        let retry_after = entry.time_until_reset(&self.limits);
        Err(match action {
            RateLimitedAction::CreateRoom => RateLimitError::RoomCreation { retry_after },
            RateLimitedAction::JoinRequest => RateLimitError::JoinRequest { retry_after },
        })
    }

    /// Forget a disconnected session.
    pub async fn remove_session(&self, session: SessionId) {
        self.entries.write().await.remove(&session);
    }

    pub async fn tracked_sessions(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    #[error("Room creation rate limit exceeded. Try again in {} seconds.", .retry_after.as_secs().max(1))]
    RoomCreation { retry_after: Duration },
    #[error("Join request rate limit exceeded. Try again in {} seconds.", .retry_after.as_secs().max(1))]
    JoinRequest { retry_after: Duration },
}

impl RateLimitError {
    pub fn retry_after(&self) -> Duration {
        match self {
            Self::RoomCreation { retry_after } | Self::JoinRequest { retry_after } => *retry_after,
        }
    }
}
