use room_relay::config::Config;
use room_relay::protocol::room_ids::generate_room_id;
use room_relay::protocol::{ClientMessage, ServerMessage, SessionId};
use room_relay::server::RelayServer;
use room_relay::websocket::create_router;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

/// Create a test server whose first rooms get predictable ids.
#[allow(dead_code)]
pub fn create_test_server() -> Arc<RelayServer> {
    create_test_server_with_config(test_config())
}

#[allow(dead_code)]
pub fn create_test_server_with_config(config: Config) -> Arc<RelayServer> {
    let mut ids: VecDeque<String> = ["a1b2c3d", "b2c3d4e", "c3d4e5f"]
        .iter()
        .map(|id| (*id).to_string())
        .collect();
    RelayServer::with_room_ids(config, move |length| {
        ids.pop_front().unwrap_or_else(|| generate_room_id(length))
    })
}

/// Default configuration tuned for tests
#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.security.max_connections_per_ip = 100;
    config.rate_limit.max_room_creations = 100;
    config.rate_limit.max_join_requests = 100;
    config.websocket.auth_timeout_secs = 5;
    config
}

/// Serve the relay on an ephemeral port and return its address.
#[allow(dead_code)]
pub async fn start_test_server(server: Arc<RelayServer>) -> SocketAddr {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router("*").with_state(server);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    addr
}

/// A client wired straight into the server through an mpsc channel.
#[allow(dead_code)]
pub struct ChannelClient {
    pub session: SessionId,
    pub receiver: mpsc::Receiver<Arc<ServerMessage>>,
    server: Arc<RelayServer>,
}

#[allow(dead_code)]
impl ChannelClient {
    pub async fn connect(server: &Arc<RelayServer>) -> Self {
        Self::connect_with_capacity(server, 64).await
    }

    pub async fn connect_with_capacity(server: &Arc<RelayServer>, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let (session, _shutdown) = server
            .register_client(sender, addr)
            .await
            .expect("registration succeeds");
        Self {
            session,
            receiver,
            server: server.clone(),
        }
    }

    /// Connect and authenticate, consuming the `authenticated` reply.
    pub async fn login(server: &Arc<RelayServer>, username: &str) -> Self {
        Self::login_with_capacity(server, username, 64).await
    }

    pub async fn login_with_capacity(
        server: &Arc<RelayServer>,
        username: &str,
        capacity: usize,
    ) -> Self {
        let mut client = Self::connect_with_capacity(server, capacity).await;
        client
            .send(ClientMessage::Authenticate {
                username: username.to_string(),
            })
            .await;
        match client.recv().await {
            ServerMessage::Authenticated { .. } => client,
            other => panic!("expected authenticated, got {other:?}"),
        }
    }

    pub async fn send(&self, message: ClientMessage) {
        self.server.handle_client_message(self.session, message).await;
    }

    pub async fn command(&self, command: &str) {
        self.send(ClientMessage::Command {
            command: command.to_string(),
        })
        .await;
    }

    pub async fn say(&self, content: &str) {
        self.send(ClientMessage::Message {
            content: content.to_string(),
        })
        .await;
    }

    pub async fn recv(&mut self) -> ServerMessage {
        let message = timeout(Duration::from_secs(1), self.receiver.recv())
            .await
            .expect("timed out waiting for envelope")
            .expect("outbound channel closed");
        (*message).clone()
    }

    /// Everything currently queued for this client.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            messages.push((*message).clone());
        }
        messages
    }

    pub async fn disconnect(&self) {
        self.server.unregister_client(self.session).await;
    }
}

/// Render chat envelopes as `sender: text` lines.
#[allow(dead_code)]
pub fn chat_lines(messages: &[ServerMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|message| match message {
            ServerMessage::Message {
                sender, content, ..
            } => Some(format!("{sender}: {content}")),
            _ => None,
        })
        .collect()
}
