//! Request middleware.
//!
//! # Data Flow
//! ```text
//! request
//!     → middleware[0] ──short-circuit──▶ response
//!         → middleware[1]
//!             → ...
//!                 → terminal handler
//!             ← ...
//!         ← middleware[1] (may rewrite the response)
//!     ← middleware[0]
//! response
//! ```
//!
//! # Design Decisions
//! - A chain is composed once at startup and only read afterwards
//! - Registration order is execution order (first registered is outermost)
//! - Middlewares hold no mutable state; anything per request travels in
//!   request extensions
//! - Own trait rather than `axum::middleware::from_fn`: chains are attached
//!   per route after our matcher picks the route, and axum only layers
//!   whole routers or its own routes

pub mod content_type;
pub mod validate;

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::{BoxFuture, FutureExt};

use crate::http::handler::{BoxHandler, Handler};

pub use content_type::SetContentType;
pub use validate::{PayloadValidator, Validated, ValidatePayload, ValidationError};

/// A request interceptor.
///
/// Either calls `next.run(req)` (optionally inspecting the response on the
/// way out) or returns its own response without calling `next`.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request<Body>, next: Next) -> BoxFuture<'static, Response>;
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn handle(&self, req: Request<Body>, next: Next) -> BoxFuture<'static, Response> {
        (**self).handle(req, next)
    }
}

/// The remainder of a chain, handed to a middleware.
#[derive(Clone)]
pub struct Next {
    inner: BoxHandler,
}

impl Next {
    /// Run the rest of the chain.
    pub async fn run(self, req: Request<Body>) -> Response {
        self.inner.call(req).await
    }
}

/// One middleware bound to the stage after it.
struct Wrapped {
    middleware: Arc<dyn Middleware>,
    next: Next,
}

impl Handler for Wrapped {
    fn call(&self, req: Request<Body>) -> BoxFuture<'static, Response> {
        self.middleware.handle(req, self.next.clone())
    }
}

/// Compose `middlewares` around `terminal` into a single handler.
pub fn build_chain(terminal: BoxHandler, middlewares: &[Arc<dyn Middleware>]) -> BoxHandler {
    middlewares.iter().rev().fold(terminal, |next, middleware| {
        Arc::new(Wrapped {
            middleware: Arc::clone(middleware),
            next: Next { inner: next },
        })
    })
}

type BoxedFn = Box<dyn Fn(Request<Body>, Next) -> BoxFuture<'static, Response> + Send + Sync>;

struct FnMiddleware(BoxedFn);

impl Middleware for FnMiddleware {
    fn handle(&self, req: Request<Body>, next: Next) -> BoxFuture<'static, Response> {
        (self.0)(req, next)
    }
}

/// Wrap an async function or closure as a middleware.
pub fn middleware_fn<F, Fut, R>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(FnMiddleware(Box::new(move |req, next| {
        let fut = f(req, next);
        async move { fut.await.into_response() }.boxed()
    })))
}
