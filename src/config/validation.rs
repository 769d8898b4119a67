//! Configuration validation functions.

use super::Config;
use crate::protocol::room_ids::{MAX_ROOM_ID_LENGTH, MIN_ROOM_ID_LENGTH};

/// Reject configurations the relay cannot run with.
///
/// Called once at startup by `main`; [`load`](super::load) only reports failures.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.security.require_metrics_auth {
        let token_present = config
            .security
            .metrics_auth_token
            .as_ref()
            .is_some_and(|t| !t.trim().is_empty());

        if !token_present {
            anyhow::bail!(
                "security.require_metrics_auth is enabled but no token is configured; \
                 set ROOM_RELAY__SECURITY__METRICS_AUTH_TOKEN"
            );
        }
    }

    let server = &config.server;
    if !(MIN_ROOM_ID_LENGTH..=MAX_ROOM_ID_LENGTH).contains(&server.room_id_length) {
        anyhow::bail!(
            "server.room_id_length must be between {MIN_ROOM_ID_LENGTH} and {MAX_ROOM_ID_LENGTH} \
             (configured: {})",
            server.room_id_length
        );
    }
    if server.history_capacity == 0 {
        anyhow::bail!("server.history_capacity must be greater than zero");
    }
    if server.max_pending_requests == 0 {
        anyhow::bail!("server.max_pending_requests must be greater than zero");
    }

    if config.rate_limit.time_window == 0 {
        anyhow::bail!("rate_limit.time_window must be greater than zero");
    }

    let protocol = &config.protocol;
    for (field, value) in [
        ("max_username_length", protocol.max_username_length),
        ("max_room_name_length", protocol.max_room_name_length),
        ("max_message_length", protocol.max_message_length),
    ] {
        if value == 0 {
            anyhow::bail!("protocol.{field} must be greater than zero");
        }
    }
    if let Some(bad) = protocol
        .allowed_username_symbols
        .iter()
        .find(|ch| ch.is_whitespace() || **ch == '/')
    {
        anyhow::bail!("protocol.allowed_username_symbols may not contain {bad:?}");
    }

    if config.security.max_message_size < 256 {
        anyhow::bail!(
            "security.max_message_size must be at least 256 bytes (configured: {})",
            config.security.max_message_size
        );
    }
    if config.security.max_connections_per_ip == 0 {
        anyhow::bail!("security.max_connections_per_ip must be greater than zero");
    }

    config.websocket.validate()?;

    Ok(())
}
