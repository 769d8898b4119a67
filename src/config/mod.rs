//! Configuration module for the room relay.
//!
//! Configuration is layered from JSON documents, environment overrides and
//! compiled defaults.
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`server`]: Room behavior and rate limits
//! - [`protocol`]: Username, room name and message limits
//! - [`security`]: CORS, frame size and per-IP limits
//! - [`logging`]: Logging configuration
//! - [`websocket`]: WebSocket connection settings
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod protocol;
pub mod security;
pub mod server;
pub mod types;
pub mod validation;
pub mod websocket;

pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use protocol::ProtocolConfig;

pub use security::SecurityConfig;

pub use server::{RateLimitConfig, ServerConfig};

pub use types::Config;

pub use validation::validate_config;

pub use websocket::WebSocketConfig;
