//! Slash commands carried by `command` envelopes.

use std::str::FromStr;
use thiserror::Error;

/// A parsed chat-prompt command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomCommand {
    /// `/approve [username]`
    Approve(Option<String>),
    /// `/reject [username]`
    Reject(Option<String>),
    /// `/history`
    History,
    /// `/members`
    Members,
    /// `/leave`
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("Commands must start with '/'")]
    MissingSlash,
    #[error("Unknown command '/{0}'")]
    Unknown(String),
    #[error("'/{0}' does not take arguments")]
    UnexpectedArgument(String),
}

impl FromStr for RoomCommand {
    type Err = CommandParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let body = raw
            .trim()
            .strip_prefix('/')
            .ok_or(CommandParseError::MissingSlash)?;

        let mut parts = body.split_whitespace();
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let argument = parts.next().map(str::to_string);
        let extra = parts.next().is_some();

        let command = match name.as_str() {
            "approve" => Self::Approve(argument.clone()),
            "reject" => Self::Reject(argument.clone()),
            "history" => Self::History,
            "members" => Self::Members,
            "leave" => Self::Leave,
            _ => return Err(CommandParseError::Unknown(name.clone())),
        };

        let takes_argument = matches!(command, Self::Approve(_) | Self::Reject(_));
        if extra || (!takes_argument && argument.is_some()) {
            return Err(CommandParseError::UnexpectedArgument(name));
        }

        Ok(command)
    }
}
