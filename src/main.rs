//! Request pipeline server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ ┌────────────┐   ┌──────────────┐   ┌───────────────┐   ┌──────────┐
//!                     │compression │──▶│  signature   │──▶│authentication │──▶│ handlers │
//!                     │  (decode)  │   │ (nonce/ts/s) │   │ (bearer token)│   │          │
//!     Client Response └────────────┘   └──────────────┘   └───────────────┘   └────┬─────┘
//!     ◀────────────── compression (encode) ◀───────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use request_pipeline::config::{load_config, PipelineConfig, PLACEHOLDER_SIGNING_KEY};
use request_pipeline::lifecycle::{signals, Shutdown};
use request_pipeline::observability::{logging, metrics};
use request_pipeline::HttpServer;

#[derive(Parser)]
#[command(name = "request-pipeline")]
#[command(about = "HTTP server with compression, signed-request and token stages", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };

    logging::init_tracing(&config.observability);
    tracing::info!("request-pipeline v{} starting", env!("CARGO_PKG_VERSION"));

    if config.token.signing_key == PLACEHOLDER_SIGNING_KEY {
        tracing::warn!("Using the placeholder token signing key; set [token] signing_key in production");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        token_lifetime_minutes = config.token.lifetime_minutes,
        exempt_paths = ?config.signature.exempt_paths,
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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;
    let shutdown = Shutdown::new();
    let serve = server.run(listener, shutdown.signalled());
    tokio::pin!(serve);

    // A signal triggers shutdown; the server then drains before `serve` completes.
    let finished = tokio::select! {
        result = &mut serve => Some(result),
        _ = signals::forward_to(&shutdown) => None,
    };
    match finished {
        Some(result) => result?,
        None => serve.await?,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
