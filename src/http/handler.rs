//! Request handler abstraction.
//!
//! A handler is the unit every stage of dispatch is expressed in: terminal
//! business actions, middleware-wrapped chains and whole routes all share
//! the same `Request -> Response` shape, so composition is just wrapping.

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::{BoxFuture, FutureExt};

/// Something that turns a request into a response.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request<Body>) -> BoxFuture<'static, Response>;
}

/// Shared, type-erased handler.
pub type BoxHandler = Arc<dyn Handler>;

type BoxedFn = Box<dyn Fn(Request<Body>) -> BoxFuture<'static, Response> + Send + Sync>;

struct FnHandler(BoxedFn);

impl Handler for FnHandler {
    fn call(&self, req: Request<Body>) -> BoxFuture<'static, Response> {
        (self.0)(req)
    }
}

/// Wrap an async function or closure as a handler.
///
/// ```ignore
/// let hello = handler_fn(|_req| async { "hello" });
/// ```
pub fn handler_fn<F, Fut, R>(f: F) -> BoxHandler
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(FnHandler(Box::new(move |req| {
        let fut = f(req);
        async move { fut.await.into_response() }.boxed()
    })))
}
