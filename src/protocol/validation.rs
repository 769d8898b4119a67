use crate::config::ProtocolConfig;
use crate::protocol::SYSTEM_SENDER;

pub fn validate_username_with_config(name: &str, config: &ProtocolConfig) -> Result<(), String> {
    if name.is_empty() {
        return Err("Username cannot be empty".to_string());
    }
    if name.chars().count() > config.max_username_length {
        return Err(format!(
            "Username too long (max {} characters)",
            config.max_username_length
        ));
    }
    if name.to_lowercase() == SYSTEM_SENDER.to_lowercase() {
        return Err(format!("Username '{name}' is reserved"));
    }
    if name.trim().len() != name.len() {
        return Err("Username cannot have leading or trailing whitespace".to_string());
    }

    for ch in name.chars() {
        if ch.is_whitespace() {
            return Err("Username cannot contain whitespace".to_string());
        }

        let is_alphanumeric = if config.allow_unicode_usernames {
            ch.is_alphanumeric()
        } else {
            ch.is_ascii_alphanumeric()
        };

        if !is_alphanumeric && !config.allowed_username_symbols.contains(&ch) {
            return Err(format!("Username contains disallowed character '{ch}'"));
        }
    }

    Ok(())
}

/// Returns the trimmed room name, or a default derived from the creator.
pub fn normalize_room_name(
    name: Option<&str>,
    creator: &str,
    config: &ProtocolConfig,
) -> Result<String, String> {
    let trimmed = name.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Ok(format!("{creator}'s room"));
    }
    if trimmed.chars().count() > config.max_room_name_length {
        return Err(format!(
            "Room name too long (max {} characters)",
            config.max_room_name_length
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err("Room name contains control characters".to_string());
    }
    Ok(trimmed.to_string())
}

pub fn validate_message_content(content: &str, config: &ProtocolConfig) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Message cannot be empty".to_string());
    }
    if content.chars().count() > config.max_message_length {
        return Err(format!(
            "Message too long (max {} characters)",
            config.max_message_length
        ));
    }
    Ok(())
}
