use crate::server::RelayServer;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;

use super::connection::handle_socket;

/// WebSocket handler for the relay protocol
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<RelayServer>>,
) -> Response {
    let max_message_size = server.config().security.max_message_size;
    // Frames well above the envelope limit are refused by the codec itself;
    // anything in between gets a MESSAGE_TOO_LARGE error from the receive loop.
    ws.max_message_size(max_message_size.saturating_mul(4))
        .on_upgrade(move |socket| handle_socket(socket, server, addr))
}
