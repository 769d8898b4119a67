use std::sync::Arc;

use super::{Outbox, RelayError, RoomCoordinator};
use crate::protocol::validation;
use crate::protocol::{FormattedMessage, ServerMessage, SessionId};

impl RoomCoordinator {
    /// Append a line to the room history and fan it out to every member in join
    /// order, skipping `exclude` when given.
    pub fn broadcast(
        &mut self,
        room_id: &str,
        sender: &str,
        text: &str,
        exclude: Option<SessionId>,
        out: &mut Outbox,
    ) -> Result<(), RelayError> {
        self.broadcast_line(room_id, FormattedMessage::new(sender, text), exclude, out)
    }

    fn broadcast_line(
        &mut self,
        room_id: &str,
        line: FormattedMessage,
        exclude: Option<SessionId>,
        out: &mut Outbox,
    ) -> Result<(), RelayError> {
        let room = self.rooms.get_mut(room_id)?;
        let envelope = Arc::new(ServerMessage::chat(room_id, &line));
        room.push_history(line);

        for member in room.member_sessions().filter(|s| Some(*s) != exclude) {
            out.send_shared(member, Arc::clone(&envelope));
        }

        self.metrics.increment_messages_broadcast();
        Ok(())
    }

    /// Send the retained history as one envelope, oldest first. Empty history sends nothing.
    pub fn send_history(
        &self,
        room_id: &str,
        session: SessionId,
        out: &mut Outbox,
    ) -> Result<(), RelayError> {
        let room = self.rooms.get(room_id)?;
        if room.history_len() == 0 {
            return Ok(());
        }

        out.send(
            session,
            ServerMessage::History {
                room_id: room.id.clone(),
                messages: room.history_snapshot(),
            },
        );
        Ok(())
    }

    /// Chat from a member, delivered to the whole room including the sender.
    pub(super) fn post_message(
        &mut self,
        session: SessionId,
        content: &str,
        out: &mut Outbox,
    ) -> Result<(), RelayError> {
        let username = self.require_username(session)?;
        let room_id = self.require_member_room(session)?;
        validation::validate_message_content(content, &self.config.protocol)
            .map_err(RelayError::InvalidMessage)?;

        self.broadcast(&room_id, &username, content, None, out)
    }

    /// Room notice authored by the relay.
    pub(super) fn broadcast_system(&mut self, room_id: &str, text: String, out: &mut Outbox) {
        if let Err(err) = self.broadcast_line(room_id, FormattedMessage::system(text), None, out) {
            tracing::warn!(room_id, error = %err, "Dropped system notice");
        }
    }
}
