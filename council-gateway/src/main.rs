//! # Council Gateway Binary
//!
//! Thin HTTP submission surface for the council orchestration core: `POST
//! /requests` decomposes and routes a prompt across the council, `GET
//! /requests/:id/events` streams its progress as Server-Sent Events, and
//! `GET /health` reports liveness.
//!
//! ## Usage
//!
//! ```bash
//! council-gateway
//! council-gateway --config my-config.toml
//! council-gateway --host 0.0.0.0 --port 8080
//! council-gateway --log-level debug
//! ```

use clap::Parser;
use council_gateway::{config::Config, server::create_server};
use std::net::SocketAddr;

/// Command line arguments for the council gateway server.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Port number for the HTTP server. Overrides the config file when set.
    #[arg(short, long)]
    port: Option<u16>,

    /// Host address to bind the server to. Overrides the config file when set.
    #[arg(long)]
    host: Option<String>,

    /// Logging level for the application.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt().with_env_filter(&args.log_level).init();

    let mut config = Config::load(&args.config)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate_schema()?;

    let app = create_server(config.clone()).await?;

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("starting council gateway on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
