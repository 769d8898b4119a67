use crate::config::Config;
use crate::protocol::{ClientMessage, ErrorCode, ServerMessage, SessionId};
use crate::server::RelayServer;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

struct TestClient {
    session: SessionId,
    shutdown: CancellationToken,
    receiver: mpsc::Receiver<Arc<ServerMessage>>,
}

impl TestClient {
    async fn recv(&mut self) -> ServerMessage {
        let message = timeout(Duration::from_millis(500), self.receiver.recv())
            .await
            .expect("timed out waiting for envelope")
            .expect("channel closed");
        (*message).clone()
    }

    async fn assert_quiet(&mut self) {
        assert!(
            timeout(Duration::from_millis(50), self.receiver.recv())
                .await
                .is_err(),
            "unexpected envelope"
        );
    }
}

async fn connect(server: &Arc<RelayServer>, capacity: usize) -> TestClient {
    let (sender, receiver) = mpsc::channel(capacity);
    let addr: SocketAddr = "127.0.0.1:50000".parse().unwrap();
    let (session, shutdown) = server
        .register_client(sender, addr)
        .await
        .expect("client registration succeeds");
    TestClient {
        session,
        shutdown,
        receiver,
    }
}

async fn login(server: &Arc<RelayServer>, name: &str) -> TestClient {
    let mut client = connect(server, 16).await;
    server
        .handle_client_message(
            client.session,
            ClientMessage::Authenticate {
                username: name.to_string(),
            },
        )
        .await;
    assert!(matches!(client.recv().await, ServerMessage::Authenticated { .. }));
    client
}

fn test_server(config: Config) -> Arc<RelayServer> {
    let mut ids = ["a1b2c3d".to_string(), "b2c3d4e".to_string()].into_iter();
    RelayServer::with_room_ids(config, move |length| {
        ids.next()
            .unwrap_or_else(|| crate::protocol::room_ids::generate_room_id(length))
    })
}

#[tokio::test]
async fn dispatch_results_reach_the_right_channels() {
    let server = test_server(Config::default());
    let mut alice = login(&server, "alice").await;
    let mut bob = login(&server, "bob").await;

    server
        .handle_client_message(alice.session, ClientMessage::CreateRoom { name: None })
        .await;
    assert_eq!(
        alice.recv().await,
        ServerMessage::RoomCreated {
            room_id: "a1b2c3d".to_string(),
            name: "alice's room".to_string(),
        }
    );

    server
        .handle_client_message(
            bob.session,
            ClientMessage::JoinRoom {
                room_id: "a1b2c3d".to_string(),
            },
        )
        .await;
    assert!(matches!(bob.recv().await, ServerMessage::JoinRequestSent { .. }));
    assert_eq!(
        alice.recv().await,
        ServerMessage::JoinRequest {
            room_id: "a1b2c3d".to_string(),
            username: "bob".to_string(),
        }
    );
    bob.assert_quiet().await;
}

#[tokio::test]
async fn room_creation_is_rate_limited_per_session() {
    let mut config = Config::default();
    config.rate_limit.max_room_creations = 1;
    let server = test_server(config);
    let mut alice = login(&server, "alice").await;

    server
        .handle_client_message(alice.session, ClientMessage::CreateRoom { name: None })
        .await;
    assert!(matches!(alice.recv().await, ServerMessage::RoomCreated { .. }));

    server
        .handle_client_message(alice.session, ClientMessage::CreateRoom { name: None })
        .await;
    match alice.recv().await {
        ServerMessage::Error { code, message } => {
            assert_eq!(code, ErrorCode::RateLimitExceeded);
            assert!(message.contains("Try again in"));
        }
        other => panic!("expected rate limit error, got {other:?}"),
    }
    assert_eq!(
        server.metrics.rate_limit_rejections.load(Ordering::Relaxed),
        1
    );
}

#[tokio::test]
async fn full_outbound_queue_drops_envelopes() {
    let server = test_server(Config::default());
    let mut alice = connect(&server, 1).await;

    for name in ["alice", "alice"] {
        server
            .handle_client_message(
                alice.session,
                ClientMessage::Authenticate {
                    username: name.to_string(),
                },
            )
            .await;
    }

    assert!(matches!(alice.recv().await, ServerMessage::Authenticated { .. }));
    alice.assert_quiet().await;
    assert_eq!(server.metrics.envelopes_dropped.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn unregister_is_an_implicit_leave() {
    let server = test_server(Config::default());
    let mut alice = login(&server, "alice").await;
    let mut bob = login(&server, "bob").await;

    server
        .handle_client_message(alice.session, ClientMessage::CreateRoom { name: None })
        .await;
    alice.recv().await;
    server
        .handle_client_message(
            bob.session,
            ClientMessage::JoinRoom {
                room_id: "a1b2c3d".to_string(),
            },
        )
        .await;
    bob.recv().await;
    alice.recv().await;

    server.unregister_client(alice.session).await;
    assert!(alice.shutdown.is_cancelled());
    assert!(!server.is_connected(alice.session));
    assert_eq!(
        bob.recv().await,
        ServerMessage::JoinRejected {
            room_id: "a1b2c3d".to_string(),
            message: "Room closed".to_string(),
        }
    );
    assert_eq!(server.room_count().await, 0);

    // second call is harmless
    server.unregister_client(alice.session).await;
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
async fn teardown_cancels_member_connections() {
    let mut config = Config::default();
    config.server.owner_departure = crate::protocol::OwnerDeparturePolicy::Teardown;
    let server = test_server(config);
    let mut alice = login(&server, "alice").await;
    let mut bob = login(&server, "bob").await;

    server
        .handle_client_message(alice.session, ClientMessage::CreateRoom { name: None })
        .await;
    alice.recv().await;
    server
        .handle_client_message(
            bob.session,
            ClientMessage::JoinRoom {
                room_id: "a1b2c3d".to_string(),
            },
        )
        .await;
    server
        .handle_client_message(alice.session, ClientMessage::ApproveJoin { username: None })
        .await;

    server.unregister_client(alice.session).await;
    assert!(bob.shutdown.is_cancelled());

    let mut saw_room_deleted = false;
    while let Ok(Some(message)) = timeout(Duration::from_millis(50), bob.receiver.recv()).await {
        if matches!(*message, ServerMessage::RoomDeleted { .. }) {
            saw_room_deleted = true;
        }
    }
    assert!(saw_room_deleted);
}

#[tokio::test]
async fn snapshot_reports_live_rooms_and_connections() {
    let server = test_server(Config::default());
    let mut alice = login(&server, "alice").await;
    server
        .handle_client_message(alice.session, ClientMessage::CreateRoom { name: None })
        .await;
    alice.recv().await;

    let snapshot = server.metrics_snapshot().await;
    assert_eq!(snapshot.rooms.active_rooms, 1);
    assert_eq!(snapshot.rooms.rooms_created, 1);
    assert_eq!(snapshot.connections.active_connections, 1);

    let health = server.health().await;
    assert_eq!(health.status, "ok");
    assert_eq!(health.active_rooms, 1);
}

#[tokio::test]
async fn shutdown_says_goodbye_and_closes_every_session() {
    let server = test_server(Config::default());
    let mut alice = login(&server, "alice").await;
    let mut idle = connect(&server, 16).await;
    server
        .handle_client_message(alice.session, ClientMessage::CreateRoom { name: None })
        .await;
    alice.recv().await;

    server.shutdown().await;

    for client in [&mut alice, &mut idle] {
        assert_eq!(
            client.recv().await,
            ServerMessage::Info {
                message: crate::server::SHUTDOWN_NOTICE.to_string()
            }
        );
        assert!(client.shutdown.is_cancelled());
        client.assert_quiet().await;
    }
}
