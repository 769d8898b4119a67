use crate::protocol::{ServerMessage, SessionId};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

pub(super) type WsSink = SplitSink<WebSocket, Message>;

const INTERNAL_ERROR_FRAME: &str =
    r#"{"type":"error","payload":{"message":"Internal error","code":"INTERNAL_ERROR"}}"#;

fn encode(message: &ServerMessage) -> String {
    match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize server message");
            INTERNAL_ERROR_FRAME.to_string()
        }
    }
}

/// Write a frame before the session is registered (e.g. IP limit rejections).
pub(super) async fn send_immediate_server_message(
    sender: &mut WsSink,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    sender.send(Message::Text(encode(message).into())).await
}

pub(super) async fn send_text_message(
    sender: &mut WsSink,
    message: &ServerMessage,
    session: SessionId,
) -> Result<(), ()> {
    if let Err(e) = sender.send(Message::Text(encode(message).into())).await {
        tracing::debug!(session_id = %session, error = %e, "Failed to write frame, connection closed");
        return Err(());
    }
    Ok(())
}
