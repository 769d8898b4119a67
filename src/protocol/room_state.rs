use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::types::{FormattedMessage, RoomId, SessionId};

// ============================================================================
// ROOM LIFECYCLE
// ============================================================================
//
// ```text
// [*] --> Open: createRoom (creator is the first member)
//
// Open --> Open: joinRoom        (candidate appended to pending queue)
// Open --> Open: approve/reject  (candidate leaves the queue, maybe joins)
// Open --> Open: creator leaves  (succession: earliest member promoted)
// Open --> [*]: last member leaves, or creator leaves under teardown
// ```
//
// Admission is serialized through the queue head: the creator is only ever told
// about `pending.front()`. Approving or rejecting by name may pick a candidate
// further back; the head announcement is then left untouched.
//
// Invariants upheld by every mutator here:
// - `creator` names a member whenever `members` is non-empty
// - a username (case-insensitive) appears at most once across members and pending
// - `history.len() <= history_capacity`, evicting the oldest append first

/// A user admitted to, or waiting on, a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub username: String,
    pub session: SessionId,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub fn new(username: impl Into<String>, session: SessionId) -> Self {
        Self {
            username: username.into(),
            session,
            joined_at: Utc::now(),
        }
    }

    fn has_name(&self, username: &str) -> bool {
        self.username.to_lowercase() == username.to_lowercase()
    }
}

/// Candidate removed from the pending queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DequeuedRequest {
    pub member: Member,
    /// Whether the candidate was the announced head of the queue.
    pub was_head: bool,
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub creator: String,
    pub created_at: DateTime<Utc>,
    members: Vec<Member>,
    pending: VecDeque<Member>,
    history: VecDeque<FormattedMessage>,
    history_capacity: usize,
}

impl Room {
    pub fn new(id: RoomId, name: String, creator: Member, history_capacity: usize) -> Self {
        Self {
            id,
            name,
            creator: creator.username.clone(),
            created_at: Utc::now(),
            members: vec![creator],
            pending: VecDeque::new(),
            history: VecDeque::with_capacity(history_capacity),
            history_capacity: history_capacity.max(1),
        }
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.username.clone()).collect()
    }

    pub fn member_sessions(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.members.iter().map(|m| m.session)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn creator_member(&self) -> Option<&Member> {
        self.members.iter().find(|m| m.username == self.creator)
    }

    pub fn creator_session(&self) -> Option<SessionId> {
        self.creator_member().map(|m| m.session)
    }

    pub fn is_creator(&self, session: SessionId) -> bool {
        self.creator_session() == Some(session)
    }

    /// Whether `username` is already a member or waiting in the queue.
    pub fn username_taken(&self, username: &str) -> bool {
        self.members.iter().any(|m| m.has_name(username))
            || self.pending.iter().any(|m| m.has_name(username))
    }

    /// Append an approved candidate. Returns `false` if the name is already a member.
    pub fn admit(&mut self, member: Member) -> bool {
        if self.members.iter().any(|m| m.has_name(&member.username)) {
            return false;
        }
        self.members.push(member);
        true
    }

    pub fn remove_member(&mut self, session: SessionId) -> Option<Member> {
        let index = self.members.iter().position(|m| m.session == session)?;
        Some(self.members.remove(index))
    }

    /// Hand ownership to the earliest-joined remaining member.
    pub fn promote_earliest_member(&mut self) -> Option<&Member> {
        let next = self.members.first()?;
        self.creator = next.username.clone();
        Some(next)
    }

    // ------------------------------------------------------------------
    // Pending join requests
    // ------------------------------------------------------------------

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_head(&self) -> Option<&Member> {
        self.pending.front()
    }

    /// Queue a candidate. Returns `true` when the candidate became the queue head
    /// and therefore must be announced to the creator.
    pub fn enqueue_request(&mut self, candidate: Member) -> bool {
        let was_empty = self.pending.is_empty();
        self.pending.push_back(candidate);
        was_empty
    }

    /// Remove a candidate by name, or the head when no name is given.
    pub fn take_pending(&mut self, username: Option<&str>) -> Option<DequeuedRequest> {
        let index = match username {
            Some(name) => self.pending.iter().position(|m| m.has_name(name))?,
            None => 0,
        };
        self.pending.remove(index).map(|member| DequeuedRequest {
            member,
            was_head: index == 0,
        })
    }

    pub fn take_pending_by_session(&mut self, session: SessionId) -> Option<DequeuedRequest> {
        let index = self.pending.iter().position(|m| m.session == session)?;
        self.pending.remove(index).map(|member| DequeuedRequest {
            member,
            was_head: index == 0,
        })
    }

    pub fn drain_pending(&mut self) -> Vec<Member> {
        self.pending.drain(..).collect()
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Append a line, returning the evicted oldest entry when over capacity.
    pub fn push_history(&mut self, line: FormattedMessage) -> Option<FormattedMessage> {
        self.history.push_back(line);
        if self.history.len() > self.history_capacity {
            self.history.pop_front()
        } else {
            None
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &FormattedMessage> {
        self.history.iter()
    }

    pub fn history_snapshot(&self) -> Vec<FormattedMessage> {
        self.history.iter().cloned().collect()
    }
}
