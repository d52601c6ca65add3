//! Response content-type tagging.

use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use axum::response::Response;
use futures_util::future::{BoxFuture, FutureExt};

use crate::http::middleware::{Middleware, Next};

/// Stamps every response passing through with a fixed `Content-Type`.
/// Never short-circuits.
#[derive(Debug, Clone)]
pub struct SetContentType {
    value: HeaderValue,
}

impl SetContentType {
    pub fn new(value: HeaderValue) -> Self {
        Self { value }
    }

    /// `application/json`.
    pub fn json() -> Self {
        Self::new(HeaderValue::from_static("application/json"))
    }
}

impl Middleware for SetContentType {
    fn handle(&self, req: Request<Body>, next: Next) -> BoxFuture<'static, Response> {
        let value = self.value.clone();
        async move {
            let mut res = next.run(req).await;
            res.headers_mut().insert(header::CONTENT_TYPE, value);
            res
        }
        .boxed()
    }
}
