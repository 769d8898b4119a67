// Protocol module: envelope types, validation, and room state

pub mod command;
pub mod error_codes;
pub mod messages;
pub mod room_ids;
pub mod room_state;
pub mod types;
pub mod validation;

pub use command::{CommandParseError, RoomCommand};
pub use error_codes::ErrorCode;
pub use messages::{ClientMessage, ServerMessage};
pub use room_state::{DequeuedRequest, Member, Room};
pub use types::{
    FormattedMessage, OwnerDeparturePolicy, RoomId, SessionId, DEFAULT_HISTORY_CAPACITY,
    DEFAULT_MAX_MESSAGE_LENGTH, DEFAULT_MAX_ROOM_NAME_LENGTH, DEFAULT_MAX_USERNAME_LENGTH,
    DEFAULT_ROOM_ID_LENGTH, SYSTEM_SENDER,
};
