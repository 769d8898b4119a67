use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::protocol::{RoomId, SessionId};

/// Where a session currently stands with respect to rooms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Binding {
    #[default]
    Idle,
    /// Admitted member of the room
    Member(RoomId),
    /// Waiting in the room's pending queue
    Pending(RoomId),
}

impl Binding {
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Member(room_id) | Self::Pending(room_id) => Some(room_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub username: Option<String>,
    pub binding: Binding,
    pub connected_at: DateTime<Utc>,
}

/// Live sessions keyed by monotonically allocated ids.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<SessionId, SessionEntry>,
    last_id: u64,
}

impl ConnectionRegistry {
    pub fn open(&mut self) -> SessionId {
        self.last_id += 1;
        let session = SessionId::new(self.last_id);
        self.sessions.insert(
            session,
            SessionEntry {
                username: None,
                binding: Binding::Idle,
                connected_at: Utc::now(),
            },
        );
        session
    }

    pub fn close(&mut self, session: SessionId) -> Option<SessionEntry> {
        self.sessions.remove(&session)
    }

    pub fn get(&self, session: SessionId) -> Option<&SessionEntry> {
        self.sessions.get(&session)
    }

    pub fn set_username(&mut self, session: SessionId, username: String) {
        if let Some(entry) = self.sessions.get_mut(&session) {
            entry.username = Some(username);
        }
    }

    /// Rebind a live session; closed sessions are ignored.
    pub fn bind(&mut self, session: SessionId, binding: Binding) {
        if let Some(entry) = self.sessions.get_mut(&session) {
            entry.binding = binding;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
