//! Service endpoints and the route table wiring them up.
//!
//! | Method | Path        | Middleware                  |
//! |--------|-------------|-----------------------------|
//! | GET    | `/`         | content type                |
//! | GET    | `/{id}`     | content type                |
//! | PUT    | `/{id}`     | payload validator, content type |
//! | POST   | `/`         | payload validator, content type |
//! | GET    | `/goodbye`  | none                        |
//!
//! `{id}` is constrained to a UUID.

pub mod goodbye;
pub mod products;

use std::sync::Arc;

use axum::http::Method;

use crate::config::ServiceConfig;
use crate::http::middleware::{SetContentType, ValidatePayload};
use crate::products::{ProductStore, ProductValidator};
use crate::routing::{RouteError, Router, UUID_PATTERN};

pub use products::{ApiError, ProductHandlers};

/// Build the service route table.
pub fn routes(
    config: &ServiceConfig,
    store: Arc<dyn ProductStore>,
    validator: Arc<ProductValidator>,
) -> Result<Router, RouteError> {
    let products = ProductHandlers::new(store);
    let by_id = format!("/{{id:{UUID_PATTERN}}}");
    let max_body = config.limits.max_body_bytes;

    Router::builder()
        .group(Method::GET, |g| {
            g.middleware(SetContentType::json())
                .route("/", products.list())
                .route(by_id.clone(), products.get())
        })
        .group(Method::PUT, |g| {
            g.middleware(ValidatePayload::new(Arc::clone(&validator), max_body))
                .middleware(SetContentType::json())
                .route(by_id.clone(), products.update())
        })
        .group(Method::POST, |g| {
            g.middleware(ValidatePayload::new(Arc::clone(&validator), max_body))
                .middleware(SetContentType::json())
                .route("/", products.create())
        })
        .group(Method::GET, |g| g.route("/goodbye", goodbye::goodbye()))
        .method_not_allowed(config.routing.method_not_allowed)
        .build()
}
