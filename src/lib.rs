#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

//! # Room Relay
//!
//! An in-memory WebSocket chat relay. Users create rooms, the creator approves
//! or rejects join requests one at a time, and members exchange messages that
//! are broadcast to the whole room with a bounded history.
//!
//! No database, no cloud services. State lives only as long as the process.

/// Server configuration and environment variables
pub mod config;

/// Room admission and broadcast coordinator
pub mod coordinator;

/// Structured logging configuration
pub mod logging;

/// Metrics collection and reporting
pub mod metrics;

/// WebSocket message protocol definitions
pub mod protocol;

/// Rate limiting implementation
pub mod rate_limit;

/// Async server shell around the coordinator
pub mod server;

/// WebSocket connection handling
pub mod websocket;
