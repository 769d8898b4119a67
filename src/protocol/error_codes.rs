use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for structured error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Identity errors
    NotAuthenticated,
    AlreadyAuthenticated,
    AuthenticationTimeout,
    InvalidUsername,

    // Envelope errors
    MalformedEnvelope,
    MessageTooLarge,
    InvalidMessage,
    UnknownCommand,

    // Room errors
    RoomNotFound,
    DuplicateUsername,
    AlreadyInRoom,
    NotInRoom,
    JoinQueueFull,
    InvalidRoomName,

    // Admission errors
    NotAuthorized,

    // Rate limiting
    RateLimitExceeded,
    TooManyConnections,

    // Server errors
    InternalError,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => {
                "You must authenticate with a username before using rooms."
            }
            Self::AlreadyAuthenticated => {
                "This connection is already bound to a username."
            }
            Self::AuthenticationTimeout => {
                "Authentication took too long to complete. Please reconnect and try again."
            }
            Self::InvalidUsername => {
                "The username is invalid. Usernames must be non-empty and meet length requirements."
            }
            Self::MalformedEnvelope => {
                "The message could not be parsed or is missing required fields."
            }
            Self::MessageTooLarge => {
                "The message size exceeds the maximum allowed limit. Please send a smaller message."
            }
            Self::InvalidMessage => {
                "The chat message is empty or longer than the allowed limit."
            }
            Self::UnknownCommand => {
                "The command is not recognized. Try /approve, /reject, /history, /members or /leave."
            }
            Self::RoomNotFound => {
                "The requested room could not be found. It may have been closed or the ID is incorrect."
            }
            Self::DuplicateUsername => {
                "That username is already taken or waiting for approval in this room."
            }
            Self::AlreadyInRoom => {
                "You are already in a room or waiting to join one. Leave it before joining another."
            }
            Self::NotInRoom => {
                "You are not currently in any room. Join a room before performing this action."
            }
            Self::JoinQueueFull => {
                "The room has too many pending join requests. Please try again later."
            }
            Self::InvalidRoomName => {
                "The room name is too long or contains control characters."
            }
            Self::NotAuthorized => {
                "Only the room creator can approve or reject join requests."
            }
            Self::RateLimitExceeded => {
                "Too many requests in a short time. Please slow down and try again later."
            }
            Self::TooManyConnections => {
                "You have too many active connections. Close some connections before opening new ones."
            }
            Self::InternalError => {
                "An internal server error occurred. Please try again."
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
