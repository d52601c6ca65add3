//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes grouped by method
//! - Look up the matching route for a request
//! - Run the group's middleware chain bound to that route
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan per group (acceptable for typical route counts)
//! - Groups are tried in registration order; inside a group the first
//!   registered route wins
//! - Every miss is an explicit 404 unless 405 reporting is enabled

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;

use crate::http::handler::BoxHandler;
use crate::http::middleware::{build_chain, Middleware};
use crate::http::response;
use crate::observability::metrics;
use crate::routing::matcher::{PathParams, PathPattern, RouteError};

/// The template of the route that handled a request, stored in the request
/// extensions next to [`PathParams`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPath(Arc<str>);

impl MatchedPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A compiled route with its middleware chain already composed.
struct Route {
    pattern: PathPattern,
    matched: MatchedPath,
    endpoint: BoxHandler,
}

/// Routes sharing a method and a middleware chain.
struct RouteGroup {
    method: Method,
    routes: Vec<Route>,
}

/// Immutable request router.
pub struct Router {
    groups: Vec<RouteGroup>,
    method_not_allowed: bool,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes: Vec<String> = self
            .groups
            .iter()
            .flat_map(|g| g.routes.iter().map(move |r| format!("{} {}", g.method, r.pattern.template())))
            .collect();
        f.debug_struct("Router")
            .field("routes", &routes)
            .field("method_not_allowed", &self.method_not_allowed)
            .finish()
    }
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Find the route for a method and path.
    fn lookup(&self, method: &Method, path: &str) -> Option<(&Route, PathParams)> {
        self.groups
            .iter()
            .filter(|group| group.method == *method)
            .flat_map(|group| group.routes.iter())
            .find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
    }

    /// Methods under which `path` would have matched.
    fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut allowed: Vec<Method> = Vec::new();
        for group in &self.groups {
            if allowed.contains(&group.method) {
                continue;
            }
            if group.routes.iter().any(|r| r.pattern.matches(path).is_some()) {
                allowed.push(group.method.clone());
            }
        }
        allowed
    }

    /// Route a request to its handler.
    pub async fn dispatch(&self, mut req: Request<Body>) -> Response {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let Some((route, params)) = self.lookup(&method, &path) else {
            let res = self.miss(&path);
            tracing::debug!(method = %method, path = %path, status = res.status().as_u16(), "No route matched");
            metrics::record_request(method.as_str(), res.status().as_u16(), metrics::UNMATCHED_ROUTE, start);
            return res;
        };

        tracing::debug!(method = %method, path = %path, route = route.matched.as_str(), "Route matched");
        req.extensions_mut().insert(params);
        req.extensions_mut().insert(route.matched.clone());

        let res = route.endpoint.call(req).await;
        metrics::record_request(method.as_str(), res.status().as_u16(), route.matched.as_str(), start);
        res
    }

    fn miss(&self, path: &str) -> Response {
        if self.method_not_allowed {
            let allowed = self.allowed_methods(path);
            if !allowed.is_empty() {
                return response::method_not_allowed(&allowed);
            }
        }
        response::not_found()
    }
}

/// Collects the routes and middlewares of one method group.
pub struct GroupBuilder {
    method: Method,
    middlewares: Vec<Arc<dyn Middleware>>,
    routes: Vec<(String, BoxHandler)>,
}

impl GroupBuilder {
    /// Append a middleware; earlier middlewares run first.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Register a route template with its terminal handler.
    pub fn route(mut self, template: impl Into<String>, handler: BoxHandler) -> Self {
        self.routes.push((template.into(), handler));
        self
    }

    fn build(self) -> Result<RouteGroup, RouteError> {
        let middlewares = self.middlewares;
        let routes = self
            .routes
            .into_iter()
            .map(|(template, handler)| {
                let pattern = PathPattern::parse(&template)?;
                Ok(Route {
                    matched: MatchedPath(Arc::from(pattern.template())),
                    pattern,
                    endpoint: build_chain(handler, &middlewares),
                })
            })
            .collect::<Result<Vec<_>, RouteError>>()?;

        Ok(RouteGroup {
            method: self.method,
            routes,
        })
    }
}

/// Builder for [`Router`].
#[derive(Default)]
pub struct RouterBuilder {
    groups: Vec<GroupBuilder>,
    method_not_allowed: bool,
}

impl RouterBuilder {
    /// Add a method group configured by `configure`.
    ///
    /// A method may have several groups (e.g. routes with and without a
    /// given middleware); they are searched in the order they were added.
    pub fn group(mut self, method: Method, configure: impl FnOnce(GroupBuilder) -> GroupBuilder) -> Self {
        let group = GroupBuilder {
            method,
            middlewares: Vec::new(),
            routes: Vec::new(),
        };
        self.groups.push(configure(group));
        self
    }

    /// Answer 405 instead of 404 when only the method is wrong.
    pub fn method_not_allowed(mut self, enabled: bool) -> Self {
        self.method_not_allowed = enabled;
        self
    }

    /// Compile every template and compose every chain.
    pub fn build(self) -> Result<Router, RouteError> {
        let groups = self
            .groups
            .into_iter()
            .map(GroupBuilder::build)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Router {
            groups,
            method_not_allowed: self.method_not_allowed,
        })
    }
}
