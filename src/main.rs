//! Product API service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ net::listener ──▶ http::server ──▶ routing::Router
//!                                                        │
//!                                     method group + path pattern
//!                                                        │
//!                                                        ▼
//!                                              middleware chain
//!                                      (payload validator, content type)
//!                                                        │
//!                                                        ▼
//!                                               handlers ──▶ products store
//!
//!     SIGINT/SIGTERM ──▶ lifecycle::signals ──▶ Shutdown ──▶ drain (grace period)
//! ```

use std::path::PathBuf;

use clap::Parser;

use product_api::config::{resolve_config, ObservabilityConfig};
use product_api::http::ShutdownOutcome;
use product_api::lifecycle::{self, startup, SignalListener};
use product_api::observability::init_logging;

#[derive(Parser, Debug)]
#[command(name = "product-api", version, about = "Product catalogue HTTP service")]
struct Cli {
    /// Path to a TOML config file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match resolve_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&ObservabilityConfig::default());
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    init_logging(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        idle_timeout_secs = config.timeouts.idle_secs,
        read_timeout_secs = config.timeouts.read_secs,
        write_timeout_secs = config.timeouts.write_secs,
        grace_period_secs = config.shutdown.grace_period_secs,
        "product-api v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let signals = SignalListener::install()?;
    let running = match startup::start(&config).await {
        Ok(running) => running,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };
    let _signals = lifecycle::forward_to(signals, running.shutdown_handle());

    match running.wait().await {
        Ok(ShutdownOutcome::Clean) => tracing::info!("Shutdown complete"),
        Ok(ShutdownOutcome::Forced { abandoned }) => {
            tracing::info!(abandoned, "Shutdown complete, in-flight requests abandoned")
        }
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            return Err(e.into());
        }
    }
    Ok(())
}
