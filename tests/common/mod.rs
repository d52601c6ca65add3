//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use product_api::config::ServiceConfig;
use product_api::http::{HttpServer, RunningServer, ServerSettings};
use product_api::lifecycle::startup;
use product_api::routing::Router;

/// Config bound to an ephemeral loopback port with short timeouts.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.shutdown.grace_period_secs = 2;
    config
}

/// Start the full service (seeded store, product routes).
pub async fn start_service(config: &ServiceConfig) -> RunningServer {
    startup::start(config).await.expect("service starts")
}

/// Start a server around a custom route table.
pub async fn start_router(router: Router, config: &ServiceConfig) -> RunningServer {
    HttpServer::new(router, ServerSettings::from(config))
        .start()
        .await
        .expect("server starts")
}

pub fn url(server: &RunningServer, path: &str) -> String {
    format!("http://{}{}", server.local_addr(), path)
}

/// Client with a short timeout so a hung test fails instead of stalling.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
