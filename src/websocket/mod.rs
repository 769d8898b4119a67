// WebSocket module - organized into focused submodules
//
// - handler: WebSocket upgrade handler (entry point)
// - connection: per-connection send task and receive loop
// - sending: envelope serialization and frame writes
// - routes: HTTP route setup (ws, health, metrics)
// - metrics: metrics endpoint and its optional bearer auth

mod connection;
mod handler;
mod metrics;
mod routes;
mod sending;

pub use handler::websocket_handler;
pub use metrics::metrics_handler;
pub use routes::{create_router, health_check, serve, serve_with_shutdown};
