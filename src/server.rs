use crate::config::Config;
use crate::coordinator::{CoordinatorConfig, Delivery, RoomCoordinator};
use crate::metrics::{MetricsSnapshot, ServerMetrics};
use crate::protocol::{RoomId, ServerMessage, SessionId};
use crate::rate_limit::{RateLimits, RoomRateLimiter};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

mod connection_manager;
mod message_router;
#[cfg(test)]
mod message_router_tests;
mod messaging;

use connection_manager::{ConnectionHandle, ConnectionManager};

/// Notice sent to every connected client when the relay stops.
pub const SHUTDOWN_NOTICE: &str = "Server is shutting down. Goodbye!";

/// Async shell around the [`RoomCoordinator`].
///
/// Every inbound envelope and every disconnect runs as one critical section on the
/// coordinator mutex. The resulting deliveries are pushed onto per-session channels
/// before the lock is released; `try_send` never waits, so the section stays short.
pub struct RelayServer {
    coordinator: Mutex<RoomCoordinator>,
    /// Outbound channels and per-IP accounting
    connection_manager: ConnectionManager,
    rate_limiter: RoomRateLimiter,
    pub(crate) metrics: Arc<ServerMetrics>,
    config: Arc<Config>,
    started_at: Instant,
}

#[derive(Debug, Error)]
pub enum RegisterClientError {
    #[error("Too many connections from your IP ({current}/{limit})")]
    IpLimitExceeded { current: usize, limit: usize },
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub active_connections: usize,
    pub active_rooms: usize,
}

impl RelayServer {
    pub fn new(config: Config) -> Arc<Self> {
        let metrics = Arc::new(ServerMetrics::new());
        let coordinator =
            RoomCoordinator::with_metrics(CoordinatorConfig::from_config(&config), metrics.clone());
        Self::build(config, coordinator, metrics)
    }

    /// Like [`RelayServer::new`] but with a custom room id generator.
    pub fn with_room_ids(
        config: Config,
        source: impl FnMut(usize) -> RoomId + Send + 'static,
    ) -> Arc<Self> {
        let metrics = Arc::new(ServerMetrics::new());
        let coordinator =
            RoomCoordinator::with_metrics(CoordinatorConfig::from_config(&config), metrics.clone())
                .with_room_ids(source);
        Self::build(config, coordinator, metrics)
    }

    fn build(config: Config, coordinator: RoomCoordinator, metrics: Arc<ServerMetrics>) -> Arc<Self> {
        let connection_manager =
            ConnectionManager::new(config.security.max_connections_per_ip, metrics.clone());
        let rate_limiter = RoomRateLimiter::new(RateLimits::from(&config.rate_limit));

        tracing::info!(
            history_capacity = config.server.history_capacity,
            owner_departure = ?config.server.owner_departure,
            max_connections_per_ip = config.security.max_connections_per_ip,
            "Relay server initialized"
        );

        Arc::new(Self {
            coordinator: Mutex::new(coordinator),
            connection_manager,
            rate_limiter,
            metrics,
            config: Arc::new(config),
            started_at: Instant::now(),
        })
    }

    /// Register a new client connection.
    ///
    /// The returned token is cancelled when the relay wants the transport closed.
    pub async fn register_client(
        &self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
    ) -> Result<(SessionId, CancellationToken), RegisterClientError> {
        self.connection_manager.reserve_ip_slot(client_addr.ip())?;

        let session = self.coordinator.lock().await.open_session();
        let shutdown = CancellationToken::new();
        self.connection_manager.insert(
            session,
            ConnectionHandle {
                sender,
                shutdown: shutdown.clone(),
                client_addr,
            },
        );

        tracing::info!(session_id = %session, %client_addr, "Client registered");
        Ok((session, shutdown))
    }

    /// Tear down a session: implicit leave, then forget its channel and rate budget.
    /// Safe to call more than once.
    pub async fn unregister_client(&self, session: SessionId) {
        let Some(handle) = self.connection_manager.remove(session) else {
            return;
        };
        handle.shutdown.cancel();

        {
            let mut coordinator = self.coordinator.lock().await;
            let deliveries = coordinator.disconnect(session);
            self.deliver(deliveries);
        }

        self.rate_limiter.remove_session(session).await;
        self.metrics.decrement_active_connections();
        tracing::info!(session_id = %session, client_addr = %handle.client_addr, "Client unregistered");
    }

    /// Send every connected client the shutdown notice, then close its transport.
    ///
    /// Each send task flushes its queue before closing, so the notice is the last
    /// envelope a client sees.
    pub async fn shutdown(&self) {
        let _coordinator = self.coordinator.lock().await;
        let sessions = self.connection_manager.sessions();
        tracing::info!(sessions = sessions.len(), "Relay shutting down");

        let notice = Arc::new(ServerMessage::Info {
            message: SHUTDOWN_NOTICE.to_string(),
        });
        let deliveries = sessions
            .into_iter()
            .flat_map(|session| {
                [
                    Delivery::Send {
                        to: session,
                        message: Arc::clone(&notice),
                    },
                    Delivery::Close { session },
                ]
            })
            .collect();
        self.deliver(deliveries);
    }

    /// Whether the session has completed `authenticate`.
    pub async fn is_authenticated(&self, session: SessionId) -> bool {
        self.coordinator.lock().await.username(session).is_some()
    }

    pub fn is_connected(&self, session: SessionId) -> bool {
        self.connection_manager.contains(session)
    }

    pub fn connection_count(&self) -> usize {
        self.connection_manager.len()
    }

    pub async fn room_count(&self) -> usize {
        self.coordinator.lock().await.room_count()
    }

    pub async fn metrics_snapshot(&self) -> MetricsSnapshot {
        let active_rooms = self.room_count().await;
        self.metrics.snapshot(active_rooms)
    }

    pub async fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok",
            uptime_secs: self.started_at.elapsed().as_secs(),
            active_connections: self.connection_count(),
            active_rooms: self.room_count().await,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }
}
