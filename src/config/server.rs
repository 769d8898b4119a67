//! Room behavior and rate limit configuration types.

use super::defaults::{
    default_deliver_history_on_join, default_history_capacity, default_max_join_requests,
    default_max_pending_requests, default_max_room_creations, default_owner_departure,
    default_rate_limit_time_window, default_room_id_length,
};
use crate::protocol::OwnerDeparturePolicy;
use serde::{Deserialize, Serialize};

/// Server configuration for room management.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Formatted messages retained per room for late joiners
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Length of generated room ids (hex characters, 4 to 32)
    #[serde(default = "default_room_id_length")]
    pub room_id_length: usize,
    /// What happens to a room when its creator leaves
    #[serde(default = "default_owner_departure")]
    pub owner_departure: OwnerDeparturePolicy,
    /// Send retained history to a candidate right after approval
    #[serde(default = "default_deliver_history_on_join")]
    pub deliver_history_on_join: bool,
    /// Maximum queued join requests per room
    #[serde(default = "default_max_pending_requests")]
    pub max_pending_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            room_id_length: default_room_id_length(),
            owner_departure: default_owner_departure(),
            deliver_history_on_join: default_deliver_history_on_join(),
            max_pending_requests: default_max_pending_requests(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    /// Maximum number of room creation requests per time window
    #[serde(default = "default_max_room_creations")]
    pub max_room_creations: u32,
    /// Maximum number of join requests per time window
    #[serde(default = "default_max_join_requests")]
    pub max_join_requests: u32,
    /// Time window for rate limiting (seconds)
    #[serde(default = "default_rate_limit_time_window")]
    pub time_window: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_room_creations: default_max_room_creations(),
            max_join_requests: default_max_join_requests(),
            time_window: default_rate_limit_time_window(),
        }
    }
}
