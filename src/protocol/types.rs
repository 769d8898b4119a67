use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default constants for validation (can be overridden by config)
pub const DEFAULT_MAX_USERNAME_LENGTH: usize = 32;
pub const DEFAULT_MAX_ROOM_NAME_LENGTH: usize = 64;
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 2000;
/// Number of formatted messages a room retains for late joiners.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;
/// Length of generated room identifiers (hex characters).
pub const DEFAULT_ROOM_ID_LENGTH: usize = 7;

/// Sender name used for notices generated by the relay itself.
pub const SYSTEM_SENDER: &str = "Server";

/// Unique identifier for rooms (short lowercase hex string)
pub type RoomId = String;

/// Stable identifier for one live transport session.
///
/// Allocated monotonically by the connection registry and never reused while the
/// process runs, so it is safe to keep in room membership after the socket is gone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// One entry of a room's history buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedMessage {
    pub sender: String,
    #[serde(rename = "content")]
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl FormattedMessage {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            sent_at: Utc::now(),
        }
    }

    /// Notice authored by the relay rather than a member.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(SYSTEM_SENDER, text)
    }
}

impl fmt::Display for FormattedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sender, self.text)
    }
}

/// What happens to a room when its creator departs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerDeparturePolicy {
    /// Promote the earliest-joined remaining member; delete only when empty.
    #[default]
    Succession,
    /// Notify and disconnect every remaining member, then delete the room.
    Teardown,
}
