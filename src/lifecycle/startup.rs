//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the product store, the payload validator and the route table
//! - Install the metrics exporter when enabled
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener starts last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::handlers;
use crate::http::{HttpServer, RunningServer, ServerError, ServerSettings};
use crate::observability::metrics;
use crate::products::{InMemoryStore, ProductStore, ProductValidator};
use crate::routing::{RouteError, Router};

/// Error type for startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid route table: {0}")]
    Routes(#[from] RouteError),
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Route table backed by the seeded in-memory store.
pub fn build_router(config: &ServiceConfig) -> Result<Router, RouteError> {
    let store: Arc<dyn ProductStore> = Arc::new(InMemoryStore::seeded());
    let validator = Arc::new(ProductValidator::new());
    handlers::routes(config, store, validator)
}

/// Initialize every subsystem and start serving.
pub async fn start(config: &ServiceConfig) -> Result<RunningServer, StartupError> {
    let router = build_router(config)?;
    tracing::debug!(router = ?router, "Route table built");

    if config.observability.metrics_enabled {
        // Address was checked during config validation.
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::warn!(error = %e, "Metrics disabled, bad address"),
        }
    }

    let server = HttpServer::new(router, ServerSettings::from(config));
    let running = server.start().await?;
    Ok(running)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_route_table_builds() {
        assert!(build_router(&ServiceConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn start_binds_ephemeral_port() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "127.0.0.1:0".to_string();

        let running = start(&config).await.unwrap();
        assert_ne!(running.local_addr().port(), 0);
        running.shutdown().await.unwrap();
    }
}
