//! Protocol limits applied to inbound envelopes.

use super::defaults::{
    default_allow_unicode_usernames, default_allowed_username_symbols,
    default_max_message_length, default_max_room_name_length, default_max_username_length,
};
use serde::{Deserialize, Serialize};

/// Protocol configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtocolConfig {
    /// Maximum length for usernames (characters)
    #[serde(default = "default_max_username_length")]
    pub max_username_length: usize,
    /// Maximum length for room names (characters)
    #[serde(default = "default_max_room_name_length")]
    pub max_room_name_length: usize,
    /// Maximum length for chat messages (characters)
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Allow non-ASCII letters/digits in usernames
    #[serde(default = "default_allow_unicode_usernames")]
    pub allow_unicode_usernames: bool,
    /// Symbol characters allowed in usernames in addition to alphanumerics
    #[serde(default = "default_allowed_username_symbols")]
    pub allowed_username_symbols: Vec<char>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_username_length: default_max_username_length(),
            max_room_name_length: default_max_room_name_length(),
            max_message_length: default_max_message_length(),
            allow_unicode_usernames: default_allow_unicode_usernames(),
            allowed_username_symbols: default_allowed_username_symbols(),
        }
    }
}

impl ProtocolConfig {
    pub fn is_allowed_symbol(&self, ch: char) -> bool {
        self.allowed_username_symbols.contains(&ch)
    }
}
