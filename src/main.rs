//! CORS Forwarding Proxy
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                     CORS PROXY                        │
//!                    │                                                       │
//!  Client Request    │  ┌──────────┐   ┌────────────┐   ┌────────────┐      │
//!  ──────────────────┼─▶│ request  │──▶│ rate limit │──▶│  request   │      │
//!  ANY /get?url=...  │  │ id/trace │   │ (fixed win)│   │ validation │      │
//!                    │  └──────────┘   └────────────┘   └─────┬──────┘      │
//!                    │                                        ▼             │
//!                    │                                 ┌────────────┐       │
//!                    │                                 │ forwarder  │───────┼──▶ Target
//!                    │                                 └─────┬──────┘       │
//!                    │                     text/html?        ▼             │
//!  Client Response   │  ┌──────────┐   ┌────────────┐  ┌────────────┐      │
//!  ◀─────────────────┼──│   CORS   │◀──│  rewriter  │◀─│  dispatch  │      │
//!                    │  │ headers  │◀──┼────────────┼──│ (stream)   │      │
//!                    │  └──────────┘   └────────────┘  └────────────┘      │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use cors_proxy::config::resolve_config;
use cors_proxy::observability::{logging, metrics};
use cors_proxy::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "cors-proxy", version, about = "Forwarding proxy with CORS headers and HTML link rewriting")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the PORT environment variable).
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = resolve_config(cli.config.as_deref(), cli.port)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        route = %config.proxy.route,
        rate_limit_enabled = config.rate_limit.enabled,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    let port = listener.local_addr()?.port();

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    tracing::info!("CORS proxy server listening on port {}", port);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
