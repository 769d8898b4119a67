use std::sync::Arc;

use super::{Binding, Outbox, RelayError, RoomCoordinator};
use crate::protocol::{OwnerDeparturePolicy, RoomId, ServerMessage, SessionId};

/// What releasing a session's binding did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Released {
    Withdrawn(RoomId),
    Departed(RoomId),
}

impl RoomCoordinator {
    /// Explicit `/leave`: withdraw a pending request or leave the current room.
    pub fn leave(&mut self, session: SessionId, out: &mut Outbox) -> Result<(), RelayError> {
        self.require_username(session)?;

        let notice = match self.release(session, out) {
            Some(Released::Withdrawn(room_id)) => {
                format!("Your join request for room {room_id} was withdrawn.")
            }
            Some(Released::Departed(room_id)) => format!("You left room {room_id}."),
            None => return Err(RelayError::NotInRoom),
        };

        out.send(session, ServerMessage::Info { message: notice });
        Ok(())
    }

    /// Drop whatever room binding the session holds, notifying the affected parties.
    pub(super) fn release(&mut self, session: SessionId, out: &mut Outbox) -> Option<Released> {
        let binding = self.sessions.get(session)?.binding.clone();
        match binding {
            Binding::Idle => None,
            Binding::Pending(room_id) => {
                self.withdraw_request(session, &room_id, out);
                Some(Released::Withdrawn(room_id))
            }
            Binding::Member(room_id) => {
                self.depart(session, &room_id, out);
                Some(Released::Departed(room_id))
            }
        }
    }

    fn withdraw_request(&mut self, session: SessionId, room_id: &str, out: &mut Outbox) {
        self.sessions.bind(session, Binding::Idle);

        let Ok(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        let Some(request) = room.take_pending_by_session(session) else {
            return;
        };

        tracing::info!(
            session_id = %session,
            room_id,
            username = %request.member.username,
            "Join request withdrawn"
        );
        if request.was_head {
            self.announce_head(room_id, out);
        }
    }

    fn depart(&mut self, session: SessionId, room_id: &str, out: &mut Outbox) {
        let span = tracing::info_span!(
            "room.leave",
            session_id = %session,
            room_id,
            username = tracing::field::Empty
        );
        let _span_guard = span.enter();

        self.sessions.bind(session, Binding::Idle);

        let Ok(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        let was_creator = room.is_creator(session);
        let Some(member) = room.remove_member(session) else {
            return;
        };
        span.record("username", member.username.as_str());
        tracing::info!(was_creator, "Member left room");

        if room.is_empty() {
            self.delete_room(room_id, out);
            return;
        }

        self.broadcast_system(room_id, format!("{} has left the room.", member.username), out);
        if !was_creator {
            return;
        }

        match self.config.owner_departure {
            OwnerDeparturePolicy::Succession => self.succeed_owner(room_id, out),
            OwnerDeparturePolicy::Teardown => self.tear_down(room_id, out),
        }
    }

    fn succeed_owner(&mut self, room_id: &str, out: &mut Outbox) {
        let Ok(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        let Some(new_owner) = room.promote_earliest_member().map(|m| m.username.clone()) else {
            return;
        };

        self.metrics.increment_owner_successions();
        tracing::info!(new_owner = %new_owner, "Room ownership transferred");

        self.broadcast_system(room_id, format!("{new_owner} is now the room owner."), out);
        self.announce_head(room_id, out);
    }

    fn tear_down(&mut self, room_id: &str, out: &mut Outbox) {
        let Ok(room) = self.rooms.get(room_id) else {
            return;
        };
        let remaining: Vec<SessionId> = room.member_sessions().collect();
        let notice = Arc::new(ServerMessage::RoomDeleted {
            room_id: room_id.to_string(),
            message: "The room owner left, so the room has been closed.".to_string(),
        });

        for session in remaining {
            out.send_shared(session, Arc::clone(&notice));
            out.close(session);
            self.sessions.bind(session, Binding::Idle);
        }

        self.delete_room(room_id, out);
    }

    /// Remove the room and reject everyone still waiting on it.
    pub(super) fn delete_room(&mut self, room_id: &str, out: &mut Outbox) {
        let Some(mut room) = self.rooms.delete(room_id) else {
            return;
        };

        for candidate in room.drain_pending() {
            self.sessions.bind(candidate.session, Binding::Idle);
            out.send(
                candidate.session,
                ServerMessage::JoinRejected {
                    room_id: room.id.clone(),
                    message: "Room closed".to_string(),
                },
            );
        }

        self.metrics.increment_rooms_deleted();
        tracing::info!(room_id, "Room deleted");
    }
}
