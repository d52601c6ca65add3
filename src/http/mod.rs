//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper connection, transport layers)
//!     → request.rs (request id, request span)
//!     → routing::Router (method group, path pattern)
//!     → middleware/ (chain built once per route)
//!     → handler.rs (terminal handler)
//!     → response.rs (error bodies, 404/405)
//! ```

pub mod handler;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use handler::{handler_fn, BoxHandler, Handler};
pub use middleware::{build_chain, middleware_fn, Middleware, Next};
pub use request::X_REQUEST_ID;
pub use server::{HttpServer, RunningServer, ServerError, ServerSettings, ServerState, ShutdownOutcome};
