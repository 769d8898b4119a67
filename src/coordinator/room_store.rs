use std::collections::HashMap;

use super::RelayError;
use crate::protocol::room_ids::{generate_room_id, normalize_room_id};
use crate::protocol::{Member, Room, RoomId};

/// Produces candidate room ids of the requested length.
pub type RoomIdSource = Box<dyn FnMut(usize) -> RoomId + Send>;

/// Attempts before giving up on finding a free id.
const MAX_ID_ATTEMPTS: usize = 64;

pub struct RoomStore {
    rooms: HashMap<RoomId, Room>,
    id_source: RoomIdSource,
    id_length: usize,
    history_capacity: usize,
}

impl RoomStore {
    pub fn new(id_length: usize, history_capacity: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            id_source: Box::new(generate_room_id),
            id_length,
            history_capacity,
        }
    }

    #[must_use]
    pub fn with_id_source(mut self, source: impl FnMut(usize) -> RoomId + Send + 'static) -> Self {
        self.id_source = Box::new(source);
        self
    }

    /// Insert a new room, regenerating the id while it collides with a live room.
    pub fn create(&mut self, name: String, creator: Member) -> Result<RoomId, RelayError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = normalize_room_id(&(self.id_source)(self.id_length));
            if self.rooms.contains_key(&id) {
                tracing::debug!(room_id = %id, "Room id collision, regenerating");
                continue;
            }

            let room = Room::new(id.clone(), name, creator, self.history_capacity);
            self.rooms.insert(id.clone(), room);
            return Ok(id);
        }

        tracing::error!(live_rooms = self.rooms.len(), "Room id space exhausted");
        Err(RelayError::RoomIdSpaceExhausted)
    }

    pub fn get(&self, id: &str) -> Result<&Room, RelayError> {
        self.rooms
            .get(id)
            .ok_or_else(|| RelayError::RoomNotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut Room, RelayError> {
        self.rooms
            .get_mut(id)
            .ok_or_else(|| RelayError::RoomNotFound(id.to_string()))
    }

    pub fn delete(&mut self, id: &str) -> Option<Room> {
        self.rooms.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rooms.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
