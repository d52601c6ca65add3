//! Farewell endpoint.

use crate::http::handler::{handler_fn, BoxHandler};

pub const FAREWELL: &str = "Goodbye";

/// `GET /goodbye`
pub fn goodbye() -> BoxHandler {
    handler_fn(|_req| async {
        tracing::info!("Handle GET goodbye");
        FAREWELL
    })
}
