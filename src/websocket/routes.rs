use crate::server::{HealthStatus, RelayServer};
use axum::extract::State;
use axum::routing::get;
use axum::Json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::handler::websocket_handler;
use super::metrics::metrics_handler;

/// Create the Axum router with WebSocket support
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<RelayServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
pub async fn health_check(State(server): State<Arc<RelayServer>>) -> Json<HealthStatus> {
    Json(server.health().await)
}

/// Serve the relay on an already-bound listener until Ctrl-C.
pub async fn serve(listener: TcpListener, server: Arc<RelayServer>) -> anyhow::Result<()> {
    serve_with_shutdown(listener, server, ctrl_c()).await
}

/// Serve until `signal` resolves, then say goodbye to every client and drain.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    server: Arc<RelayServer>,
    signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(&server.config().security.cors_origins).with_state(server.clone());

    tracing::info!(addr = %listener.local_addr()?, "Room relay listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        signal.await;
        server.shutdown().await;
    })
    .await?;

    tracing::info!("Room relay stopped");
    Ok(())
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(err) => {
            tracing::error!(error = %err, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}
