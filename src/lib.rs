//! Product catalogue HTTP service.
//!
//! Routes requests by method and path pattern through per-route middleware
//! chains, and drains in-flight requests on SIGINT/SIGTERM.

pub mod config;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod products;
pub mod resilience;
pub mod routing;

pub use config::ServiceConfig;
pub use http::{HttpServer, RunningServer, ShutdownOutcome};
pub use lifecycle::Shutdown;
pub use routing::Router;
