use super::{Binding, Outbox, RelayError, RoomCoordinator};
use crate::protocol::room_ids::normalize_room_id;
use crate::protocol::{DequeuedRequest, Member, ServerMessage, SessionId};

impl RoomCoordinator {
    /// Queue a join request for the session's username.
    ///
    /// Only the head of the queue is ever announced to the creator, so the
    /// announcement is sent only when the queue was empty.
    pub fn request_join(
        &mut self,
        session: SessionId,
        room_id: &str,
        out: &mut Outbox,
    ) -> Result<(), RelayError> {
        let username = self.require_username(session)?;
        let room_id = normalize_room_id(room_id);

        let span = tracing::info_span!(
            "room.join_request",
            session_id = %session,
            room_id = %room_id,
            username = %username
        );
        let _span_guard = span.enter();

        let room = self.rooms.get(&room_id)?;
        if room.username_taken(&username) {
            return Err(RelayError::DuplicateUsername {
                username,
                room_id,
            });
        }
        self.require_idle(session)?;
        if room.pending_len() >= self.config.max_pending_requests {
            return Err(RelayError::JoinQueueFull(room_id));
        }

        let room = self.rooms.get_mut(&room_id)?;
        let creator = room.creator.clone();
        let became_head = room.enqueue_request(Member::new(username, session));
        let position = room.pending_len();

        self.sessions.bind(session, Binding::Pending(room_id.clone()));
        self.metrics.increment_join_requests();
        tracing::info!(position, "Join request queued");

        out.send(
            session,
            ServerMessage::JoinRequestSent {
                room_id: room_id.clone(),
                message: format!("Join request sent to {creator}. Waiting for approval."),
            },
        );
        if became_head {
            self.announce_head(&room_id, out);
        }
        Ok(())
    }

    /// Admit a pending candidate. With no name the queue head is approved; a name
    /// that is not queued is ignored.
    pub fn approve(
        &mut self,
        session: SessionId,
        target: Option<&str>,
        out: &mut Outbox,
    ) -> Result<(), RelayError> {
        let room_id = self.require_creator_room(session, "approve join requests")?;
        let room = self.rooms.get_mut(&room_id)?;

        let Some(DequeuedRequest { member, was_head }) = room.take_pending(target) else {
            if target.is_none() {
                out.send(session, no_pending_notice());
            }
            return Ok(());
        };

        let room_name = room.name.clone();
        let username = member.username.clone();
        let candidate = member.session;
        if !room.admit(member) {
            tracing::warn!(
                session_id = %candidate,
                room_id = %room_id,
                username = %username,
                "Candidate name already a member, request dropped"
            );
            self.sessions.bind(candidate, Binding::Idle);
            out.send(
                candidate,
                ServerMessage::JoinRejected {
                    room_id: room_id.clone(),
                    message: format!("{username} is already a member of {room_name}."),
                },
            );
            if was_head {
                self.announce_head(&room_id, out);
            }
            return Ok(());
        }

        self.sessions.bind(candidate, Binding::Member(room_id.clone()));
        self.metrics.increment_join_approvals();
        tracing::info!(
            session_id = %candidate,
            room_id = %room_id,
            username = %username,
            "Join request approved"
        );

        out.send(
            candidate,
            ServerMessage::JoinApproved {
                room_id: room_id.clone(),
                name: room_name,
            },
        );
        if self.config.deliver_history_on_join {
            self.send_history(&room_id, candidate, out)?;
        }
        self.broadcast_system(&room_id, format!("{username} has joined the room."), out);

        if was_head {
            self.announce_head(&room_id, out);
        }
        Ok(())
    }

    /// Decline a pending candidate; nothing is broadcast to the room.
    pub fn reject(
        &mut self,
        session: SessionId,
        target: Option<&str>,
        out: &mut Outbox,
    ) -> Result<(), RelayError> {
        let room_id = self.require_creator_room(session, "reject join requests")?;
        let room = self.rooms.get_mut(&room_id)?;

        let Some(DequeuedRequest { member, was_head }) = room.take_pending(target) else {
            if target.is_none() {
                out.send(session, no_pending_notice());
            }
            return Ok(());
        };
        let room_name = room.name.clone();

        self.sessions.bind(member.session, Binding::Idle);
        self.metrics.increment_join_rejections();
        tracing::info!(
            session_id = %member.session,
            room_id = %room_id,
            username = %member.username,
            "Join request rejected"
        );

        out.send(
            member.session,
            ServerMessage::JoinRejected {
                room_id: room_id.clone(),
                message: format!("Your request to join {room_name} was declined."),
            },
        );

        if was_head {
            self.announce_head(&room_id, out);
        }
        Ok(())
    }

    /// Tell the current creator about the candidate at the head of the queue, if any.
    pub(super) fn announce_head(&self, room_id: &str, out: &mut Outbox) {
        let Ok(room) = self.rooms.get(room_id) else {
            return;
        };
        let (Some(head), Some(creator)) = (room.pending_head(), room.creator_session()) else {
            return;
        };

        out.send(
            creator,
            ServerMessage::JoinRequest {
                room_id: room.id.clone(),
                username: head.username.clone(),
            },
        );
    }
}

fn no_pending_notice() -> ServerMessage {
    ServerMessage::Info {
        message: "No pending join requests.".to_string(),
    }
}
