use crate::coordinator::RelayError;
use crate::protocol::{ClientMessage, ErrorCode, ServerMessage, SessionId};
use crate::server::{RegisterClientError, RelayServer};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::sending::{send_immediate_server_message, send_text_message, WsSink};

pub(super) async fn handle_socket(socket: WebSocket, server: Arc<RelayServer>, addr: SocketAddr) {
    let (mut sender, receiver) = socket.split();
    let queue_capacity = server.config().websocket.outbound_queue_capacity.max(1);
    let (tx, rx) = mpsc::channel::<Arc<ServerMessage>>(queue_capacity);

    let (session, shutdown) = match server.register_client(tx, addr).await {
        Ok(registered) => registered,
        Err(err @ RegisterClientError::IpLimitExceeded { .. }) => {
            let error_message = ServerMessage::error(ErrorCode::TooManyConnections, err.to_string());
            if let Err(err) = send_immediate_server_message(&mut sender, &error_message).await {
                tracing::debug!(
                    client_addr = %addr,
                    error = %err,
                    "Failed to send IP limit error frame"
                );
            }
            let _ = sender.close().await;
            return;
        }
    };
    tracing::info!(session_id = %session, client_addr = %addr, "WebSocket connection established");

    let send_task = tokio::spawn(send_loop(sender, rx, shutdown.clone(), session));
    let receive_task = tokio::spawn(receive_loop(
        receiver,
        server.clone(),
        session,
        shutdown.clone(),
    ));

    tokio::select! {
        _ = send_task => {
            tracing::debug!(session_id = %session, "Send task completed");
        }
        _ = receive_task => {
            tracing::debug!(session_id = %session, "Receive task completed");
        }
    }

    // Cancels the token, which stops whichever task is still running.
    server.unregister_client(session).await;
}

/// Drain the outbound queue onto the socket. On shutdown, flush what is queued and close.
async fn send_loop(
    mut sender: WsSink,
    mut rx: mpsc::Receiver<Arc<ServerMessage>>,
    shutdown: CancellationToken,
    session: SessionId,
) {
    loop {
        tokio::select! {
            biased;
            message = rx.recv() => {
                let Some(message) = message else { break };
                if send_text_message(&mut sender, &message, session).await.is_err() {
                    return;
                }
            }
            () = shutdown.cancelled() => {
                while let Ok(message) = rx.try_recv() {
                    if send_text_message(&mut sender, &message, session).await.is_err() {
                        return;
                    }
                }
                break;
            }
        }
    }

    let _ = sender.close().await;
}

async fn receive_loop(
    mut receiver: SplitStream<WebSocket>,
    server: Arc<RelayServer>,
    session: SessionId,
    shutdown: CancellationToken,
) {
    let auth_timeout_secs = server.config().websocket.auth_timeout_secs;
    let max_size = server.config().security.max_message_size;
    let auth_deadline = tokio::time::sleep(Duration::from_secs(auth_timeout_secs));
    tokio::pin!(auth_deadline);
    let mut authenticated = false;

    loop {
        let frame = tokio::select! {
            frame = receiver.next() => frame,
            () = &mut auth_deadline, if !authenticated => {
                tracing::warn!(session_id = %session, timeout_secs = auth_timeout_secs, "Authentication timeout, closing connection");
                server.send_error(
                    session,
                    ErrorCode::AuthenticationTimeout,
                    format!("Authentication timeout - must authenticate within {auth_timeout_secs} seconds"),
                );
                break;
            }
            () = shutdown.cancelled() => break,
        };

        let frame = match frame {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                tracing::warn!(session_id = %session, error = %e, "WebSocket error");
                break;
            }
            None => break,
        };

        match frame {
            Message::Text(text) => {
                let text = text.as_str();
                if text.len() > max_size {
                    tracing::warn!(
                        session_id = %session,
                        size = text.len(),
                        max = max_size,
                        "Message exceeds size limit"
                    );
                    server.send_error(
                        session,
                        ErrorCode::MessageTooLarge,
                        format!("Message too large ({} bytes, max {max_size} bytes)", text.len()),
                    );
                    continue;
                }

                let message = match serde_json::from_str::<ClientMessage>(text) {
                    Ok(message) => message,
                    Err(err) => {
                        reject_malformed(&server, session, err.to_string());
                        continue;
                    }
                };

                let is_authenticate = matches!(message, ClientMessage::Authenticate { .. });
                server.handle_client_message(session, message).await;
                if is_authenticate && !authenticated {
                    authenticated = server.is_authenticated(session).await;
                }
            }
            Message::Binary(payload) => {
                reject_malformed(
                    &server,
                    session,
                    format!("binary frames are not supported ({} bytes)", payload.len()),
                );
            }
            Message::Close(_) => {
                tracing::info!(session_id = %session, "WebSocket connection closed by client");
                break;
            }
            // Ping/pong is answered by axum
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

fn reject_malformed(server: &RelayServer, session: SessionId, reason: String) {
    tracing::warn!(session_id = %session, error = %reason, "Rejected malformed envelope");
    server.metrics.increment_malformed_envelopes();
    server.send_relay_error(session, &RelayError::MalformedEnvelope(reason));
}
