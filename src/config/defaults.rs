//! Default value functions for configuration fields.
//!
//! Used by the `#[serde(default = ...)]` attributes across the configuration
//! sections, grouped by the section they belong to.

use super::logging::LogFormat;
use crate::protocol::types::{
    OwnerDeparturePolicy, DEFAULT_HISTORY_CAPACITY, DEFAULT_MAX_MESSAGE_LENGTH,
    DEFAULT_MAX_ROOM_NAME_LENGTH, DEFAULT_MAX_USERNAME_LENGTH, DEFAULT_ROOM_ID_LENGTH,
};

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    3000
}

// =============================================================================
// Server Defaults
// =============================================================================

pub const fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

pub const fn default_room_id_length() -> usize {
    DEFAULT_ROOM_ID_LENGTH
}

pub const fn default_owner_departure() -> OwnerDeparturePolicy {
    OwnerDeparturePolicy::Succession
}

pub const fn default_deliver_history_on_join() -> bool {
    true
}

pub const fn default_max_pending_requests() -> usize {
    32
}

// =============================================================================
// Rate Limit Defaults
// =============================================================================

pub const fn default_max_room_creations() -> u32 {
    5
}

pub const fn default_max_join_requests() -> u32 {
    20
}

pub const fn default_rate_limit_time_window() -> u64 {
    60
}

// =============================================================================
// Protocol Defaults
// =============================================================================

pub const fn default_max_username_length() -> usize {
    DEFAULT_MAX_USERNAME_LENGTH
}

pub const fn default_max_room_name_length() -> usize {
    DEFAULT_MAX_ROOM_NAME_LENGTH
}

pub const fn default_max_message_length() -> usize {
    DEFAULT_MAX_MESSAGE_LENGTH
}

pub const fn default_allow_unicode_usernames() -> bool {
    true
}

pub fn default_allowed_username_symbols() -> Vec<char> {
    vec!['-', '_', '.']
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "room-relay.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "*".to_string()
}

pub const fn default_max_message_size() -> usize {
    16 * 1024
}

pub const fn default_max_connections_per_ip() -> usize {
    16
}

// =============================================================================
// WebSocket Defaults
// =============================================================================

pub const fn default_auth_timeout_secs() -> u64 {
    10
}

pub const fn default_outbound_queue_capacity() -> usize {
    256
}
