#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use room_relay::config;
use room_relay::logging;
use room_relay::server::RelayServer;
use room_relay::websocket;
use std::net::SocketAddr;

/// Room relay -- in-memory WebSocket chat rooms with creator-approved admission
#[derive(Parser, Debug)]
#[command(name = "room-relay")]
#[command(about = "An in-memory WebSocket chat relay with creator-approved room admission")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,

    /// Listen port, overriding the configured one.
    #[arg(long, short = 'p', env = "ROOM_RELAY_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load();
    if let Some(port) = cli.port {
        cfg.port = port;
    }

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    // config::load() only reports validation problems on stderr; here they are fatal.
    let validation_result = config::validate_config(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  History capacity: {}", cfg.server.history_capacity);
                println!("  Owner departure: {:?}", cfg.server.owner_departure);
                println!(
                    "  Max pending requests: {}",
                    cfg.server.max_pending_requests
                );
                println!(
                    "  Metrics auth required: {}",
                    cfg.security.require_metrics_auth
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(
        %addr,
        cors_origins = %cfg.security.cors_origins,
        "Starting room relay"
    );

    let server = RelayServer::new(cfg);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    websocket::serve(listener, server).await
}
