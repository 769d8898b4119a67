//! Room admission and broadcast coordinator.
//!
//! [`RoomCoordinator`] owns every room and session binding. It is a plain
//! synchronous state machine: each inbound envelope or disconnect is handled by
//! one `&mut self` call that returns the [`Delivery`] list to perform. The async
//! server shell holds it behind a single mutex and performs the deliveries after
//! releasing the lock.

use std::sync::Arc;

use thiserror::Error;

use crate::config::{Config, ProtocolConfig};
use crate::metrics::ServerMetrics;
use crate::protocol::command::RoomCommand;
use crate::protocol::validation;
use crate::protocol::{
    ClientMessage, ErrorCode, Member, OwnerDeparturePolicy, Room, RoomId, ServerMessage,
    SessionId, DEFAULT_HISTORY_CAPACITY, DEFAULT_ROOM_ID_LENGTH,
};

mod admission;
mod broadcast;
mod lifecycle;
mod registry;
mod room_store;


pub use registry::{Binding, ConnectionRegistry, SessionEntry};
pub use room_store::{RoomIdSource, RoomStore};

/// Room behavior knobs, derived from the `server` and `protocol` config sections.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub history_capacity: usize,
    pub room_id_length: usize,
    pub owner_departure: OwnerDeparturePolicy,
    pub deliver_history_on_join: bool,
    pub max_pending_requests: usize,
    pub protocol: ProtocolConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            room_id_length: DEFAULT_ROOM_ID_LENGTH,
            owner_departure: OwnerDeparturePolicy::default(),
            deliver_history_on_join: true,
            max_pending_requests: 32,
            protocol: ProtocolConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            history_capacity: config.server.history_capacity,
            room_id_length: config.server.room_id_length,
            owner_departure: config.server.owner_departure,
            deliver_history_on_join: config.server.deliver_history_on_join,
            max_pending_requests: config.server.max_pending_requests,
            protocol: config.protocol.clone(),
        }
    }
}

/// One side effect requested by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Queue an envelope on the session's outbound channel
    Send {
        to: SessionId,
        message: Arc<ServerMessage>,
    },
    /// Close the session's transport
    Close { session: SessionId },
}

/// Deliveries accumulated while handling one event, in emission order.
#[derive(Debug, Default)]
pub struct Outbox {
    deliveries: Vec<Delivery>,
}

impl Outbox {
    pub fn send(&mut self, to: SessionId, message: ServerMessage) {
        self.send_shared(to, Arc::new(message));
    }

    pub fn send_shared(&mut self, to: SessionId, message: Arc<ServerMessage>) {
        self.deliveries.push(Delivery::Send { to, message });
    }

    pub fn close(&mut self, session: SessionId) {
        self.deliveries.push(Delivery::Close { session });
    }

    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    pub fn into_deliveries(self) -> Vec<Delivery> {
        self.deliveries
    }
}

/// Recoverable errors reported to the originating session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("Room {0} does not exist")]
    RoomNotFound(RoomId),
    #[error("The name {username} is already in use in room {room_id}")]
    DuplicateUsername { username: String, room_id: RoomId },
    #[error("Only the room creator can {0}")]
    NotAuthorized(&'static str),
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),
    #[error("Authenticate with a username first")]
    NotAuthenticated,
    #[error("Already authenticated as {0}")]
    AlreadyAuthenticated(String),
    #[error("Already in or waiting on room {0}")]
    AlreadyInRoom(RoomId),
    #[error("You are not in a room")]
    NotInRoom,
    #[error("{0}")]
    InvalidUsername(String),
    #[error("{0}")]
    InvalidRoomName(String),
    #[error("{0}")]
    InvalidMessage(String),
    #[error("{0}")]
    UnknownCommand(String),
    #[error("{0}")]
    RateLimitExceeded(String),
    #[error("Room {0} has too many pending join requests")]
    JoinQueueFull(RoomId),
    #[error("Could not allocate a free room id")]
    RoomIdSpaceExhausted,
}

impl RelayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RoomNotFound(_) => ErrorCode::RoomNotFound,
            Self::DuplicateUsername { .. } => ErrorCode::DuplicateUsername,
            Self::NotAuthorized(_) => ErrorCode::NotAuthorized,
            Self::MalformedEnvelope(_) => ErrorCode::MalformedEnvelope,
            Self::NotAuthenticated => ErrorCode::NotAuthenticated,
            Self::AlreadyAuthenticated(_) => ErrorCode::AlreadyAuthenticated,
            Self::AlreadyInRoom(_) => ErrorCode::AlreadyInRoom,
            Self::NotInRoom => ErrorCode::NotInRoom,
            Self::InvalidUsername(_) => ErrorCode::InvalidUsername,
            Self::InvalidRoomName(_) => ErrorCode::InvalidRoomName,
            Self::InvalidMessage(_) => ErrorCode::InvalidMessage,
            Self::UnknownCommand(_) => ErrorCode::UnknownCommand,
            Self::RateLimitExceeded(_) => ErrorCode::RateLimitExceeded,
            Self::JoinQueueFull(_) => ErrorCode::JoinQueueFull,
            Self::RoomIdSpaceExhausted => ErrorCode::InternalError,
        }
    }

    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::error(self.code(), self.to_string())
    }
}

pub struct RoomCoordinator {
    config: CoordinatorConfig,
    rooms: RoomStore,
    sessions: ConnectionRegistry,
    metrics: Arc<ServerMetrics>,
}

impl RoomCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self::with_metrics(config, Arc::new(ServerMetrics::new()))
    }

    pub fn with_metrics(config: CoordinatorConfig, metrics: Arc<ServerMetrics>) -> Self {
        let rooms = RoomStore::new(config.room_id_length, config.history_capacity);
        Self {
            config,
            rooms,
            sessions: ConnectionRegistry::default(),
            metrics,
        }
    }

    /// Replace the room id generator, e.g. with a fixed sequence in tests.
    #[must_use]
    pub fn with_room_ids(mut self, source: impl FnMut(usize) -> RoomId + Send + 'static) -> Self {
        self.rooms = self.rooms.with_id_source(source);
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Allocate a session for a freshly accepted connection.
    pub fn open_session(&mut self) -> SessionId {
        self.sessions.open()
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id).ok()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn binding(&self, session: SessionId) -> Option<&Binding> {
        self.sessions.get(session).map(|entry| &entry.binding)
    }

    pub fn username(&self, session: SessionId) -> Option<&str> {
        self.sessions.get(session)?.username.as_deref()
    }

    /// Handle one inbound envelope. Errors become an `error` envelope to the sender.
    pub fn dispatch(&mut self, session: SessionId, message: ClientMessage) -> Vec<Delivery> {
        let kind = message.kind();
        let mut out = Outbox::default();

        if let Err(err) = self.route(session, message, &mut out) {
            tracing::debug!(session_id = %session, kind, error = %err, "Request rejected");
            self.metrics.increment_client_errors();
            out.send(session, err.to_message());
        }

        out.into_deliveries()
    }

    /// Treat a closed transport as an implicit leave and forget the session.
    pub fn disconnect(&mut self, session: SessionId) -> Vec<Delivery> {
        let mut out = Outbox::default();
        self.release(session, &mut out);
        self.sessions.close(session);
        out.into_deliveries()
    }

    fn route(
        &mut self,
        session: SessionId,
        message: ClientMessage,
        out: &mut Outbox,
    ) -> Result<(), RelayError> {
        match message {
            ClientMessage::Authenticate { username } => self.authenticate(session, username, out),
            ClientMessage::CreateRoom { name } => {
                self.create_room(session, name.as_deref(), out).map(|_| ())
            }
            ClientMessage::JoinRoom { room_id } => self.request_join(session, &room_id, out),
            ClientMessage::ApproveJoin { username } => {
                self.approve(session, username.as_deref(), out)
            }
            ClientMessage::RejectJoin { username } => self.reject(session, username.as_deref(), out),
            ClientMessage::Message { content } => self.post_message(session, &content, out),
            ClientMessage::Command { command } => self.run_command(session, &command, out),
        }
    }

    pub fn authenticate(
        &mut self,
        session: SessionId,
        username: String,
        out: &mut Outbox,
    ) -> Result<(), RelayError> {
        let entry = self
            .sessions
            .get(session)
            .ok_or(RelayError::NotAuthenticated)?;
        if let Some(existing) = &entry.username {
            return Err(RelayError::AlreadyAuthenticated(existing.clone()));
        }

        validation::validate_username_with_config(&username, &self.config.protocol)
            .map_err(RelayError::InvalidUsername)?;

        self.sessions.set_username(session, username.clone());
        tracing::info!(session_id = %session, %username, "Session authenticated");
        out.send(session, ServerMessage::Authenticated { username });
        Ok(())
    }

    /// Create a room with the session as creator and first member.
    pub fn create_room(
        &mut self,
        session: SessionId,
        name: Option<&str>,
        out: &mut Outbox,
    ) -> Result<RoomId, RelayError> {
        let username = self.require_username(session)?;
        self.require_idle(session)?;
        let name = validation::normalize_room_name(name, &username, &self.config.protocol)
            .map_err(RelayError::InvalidRoomName)?;

        let span = tracing::info_span!(
            "room.create",
            session_id = %session,
            username = %username,
            room_id = tracing::field::Empty
        );
        let _span_guard = span.enter();

        let room_id = self
            .rooms
            .create(name.clone(), Member::new(username, session))?;
        span.record("room_id", room_id.as_str());

        self.sessions.bind(session, Binding::Member(room_id.clone()));
        self.metrics.increment_rooms_created();
        tracing::info!(room_name = %name, "Room created");

        out.send(
            session,
            ServerMessage::RoomCreated {
                room_id: room_id.clone(),
                name,
            },
        );
        Ok(room_id)
    }

    fn run_command(
        &mut self,
        session: SessionId,
        raw: &str,
        out: &mut Outbox,
    ) -> Result<(), RelayError> {
        let command = raw
            .parse::<RoomCommand>()
            .map_err(|e| RelayError::UnknownCommand(e.to_string()))?;

        match command {
            RoomCommand::Approve(target) => self.approve(session, target.as_deref(), out),
            RoomCommand::Reject(target) => self.reject(session, target.as_deref(), out),
            RoomCommand::History => {
                let room_id = self.require_member_room(session)?;
                self.send_history(&room_id, session, out)
            }
            RoomCommand::Members => self.send_members(session, out),
            RoomCommand::Leave => self.leave(session, out),
        }
    }

    fn send_members(&self, session: SessionId, out: &mut Outbox) -> Result<(), RelayError> {
        let room_id = self.require_member_room(session)?;
        let room = self.rooms.get(&room_id)?;
        out.send(
            session,
            ServerMessage::Members {
                room_id,
                creator: room.creator.clone(),
                members: room.member_names(),
                pending: room.pending_len(),
            },
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Session guards
    // ------------------------------------------------------------------

    fn require_username(&self, session: SessionId) -> Result<String, RelayError> {
        self.sessions
            .get(session)
            .and_then(|entry| entry.username.clone())
            .ok_or(RelayError::NotAuthenticated)
    }

    fn require_idle(&self, session: SessionId) -> Result<(), RelayError> {
        match self.binding(session) {
            None => Err(RelayError::NotAuthenticated),
            Some(Binding::Idle) => Ok(()),
            Some(Binding::Member(room_id) | Binding::Pending(room_id)) => {
                Err(RelayError::AlreadyInRoom(room_id.clone()))
            }
        }
    }

    fn require_member_room(&self, session: SessionId) -> Result<RoomId, RelayError> {
        self.require_username(session)?;
        match self.binding(session) {
            Some(Binding::Member(room_id)) => Ok(room_id.clone()),
            _ => Err(RelayError::NotInRoom),
        }
    }

    fn require_creator_room(
        &self,
        session: SessionId,
        action: &'static str,
    ) -> Result<RoomId, RelayError> {
        let room_id = self.require_member_room(session)?;
        if !self.rooms.get(&room_id)?.is_creator(session) {
            return Err(RelayError::NotAuthorized(action));
        }
        Ok(room_id)
    }
}
