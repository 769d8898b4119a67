use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error_codes::ErrorCode;
use super::types::{FormattedMessage, RoomId};

/// Envelopes sent from client to server.
///
/// Wire shape is `{"type": "...", "payload": {...}}`; unknown payload fields are ignored
/// so clients may attach their own bookkeeping (tokens, current room id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Bind the identity established by the outer auth layer (MUST be first message)
    Authenticate { username: String },
    /// Create a room; the sender becomes its creator and first member
    CreateRoom {
        #[serde(default)]
        name: Option<String>,
    },
    /// Ask the creator of a room for admission
    JoinRoom { room_id: RoomId },
    /// Creator approves a pending request (queue head when no username is given)
    ApproveJoin {
        #[serde(default)]
        username: Option<String>,
    },
    /// Creator rejects a pending request (queue head when no username is given)
    RejectJoin {
        #[serde(default)]
        username: Option<String>,
    },
    /// Chat text broadcast to the sender's room
    Message { content: String },
    /// Slash command typed into the chat prompt, e.g. `/approve bob`
    Command { command: String },
}

impl ClientMessage {
    /// Envelope type as it appears on the wire, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "authenticate",
            Self::CreateRoom { .. } => "createRoom",
            Self::JoinRoom { .. } => "joinRoom",
            Self::ApproveJoin { .. } => "approveJoin",
            Self::RejectJoin { .. } => "rejectJoin",
            Self::Message { .. } => "message",
            Self::Command { .. } => "command",
        }
    }
}

/// Envelopes sent from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Identity accepted
    Authenticated { username: String },
    /// Room created; the receiver is its creator
    RoomCreated { room_id: RoomId, name: String },
    /// Join request queued, waiting for the creator
    JoinRequestSent { room_id: RoomId, message: String },
    /// Sent to the creator: a candidate is waiting at the head of the queue
    JoinRequest { room_id: RoomId, username: String },
    /// Sent to a candidate whose request was approved
    JoinApproved { room_id: RoomId, name: String },
    /// Sent to a candidate whose request was rejected or whose room closed
    JoinRejected { room_id: RoomId, message: String },
    /// Chat line or system notice broadcast to a room
    Message {
        room_id: RoomId,
        sender: String,
        content: String,
        sent_at: DateTime<Utc>,
    },
    /// Retained history, oldest first
    History {
        room_id: RoomId,
        messages: Vec<FormattedMessage>,
    },
    /// Current membership in join order
    Members {
        room_id: RoomId,
        creator: String,
        members: Vec<String>,
        pending: usize,
    },
    /// Informational notice addressed to one session
    Info { message: String },
    /// Room closed because its creator left (teardown policy)
    RoomDeleted { room_id: RoomId, message: String },
    /// Error message
    Error { message: String, code: ErrorCode },
}

impl ServerMessage {
    pub fn chat(room_id: &str, line: &FormattedMessage) -> Self {
        Self::Message {
            room_id: room_id.to_string(),
            sender: line.sender.clone(),
            content: line.text.clone(),
            sent_at: line.sent_at,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            code,
        }
    }
}
