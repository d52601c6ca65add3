//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Wrap the routing engine in the transport middleware stack
//!   (request id, tracing, body read timeout, response timeout)
//! - Bind the listener and run the accept loop on its own task
//! - Serve every connection on its own task with per-connection timeouts
//! - Drain on shutdown, abandoning whatever outlives the grace period
//!
//! # States
//! ```text
//! Idle ──start()──▶ Serving ──trigger──▶ ShuttingDown ──drained / deadline──▶ Stopped
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::Response;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tower::ServiceExt;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::ServiceConfig;
use crate::http::request::request_span;
use crate::lifecycle::{Shutdown, ShutdownListener};
use crate::net::{ConnectionTracker, Listener, ListenerError, TimeoutStream};
use crate::resilience::AcceptBackoff;
use crate::routing::Router;

/// Lifecycle state of an [`HttpServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    Serving,
    ShuttingDown,
    Stopped,
}

/// How the server reached [`ServerState::Stopped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight connection finished inside the grace period.
    Clean,
    /// The grace period ran out; `abandoned` connections were cut.
    Forced { abandoned: u64 },
}

/// Error type for server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("accept loop stopped before shutdown was requested")]
    AcceptLoopExited,
    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Transport settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind_address: String,
    pub max_connections: usize,
    pub idle_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub grace_period: Duration,
}

impl From<&ServiceConfig> for ServerSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            bind_address: config.listener.bind_address.clone(),
            max_connections: config.listener.max_connections,
            idle_timeout: config.timeouts.idle(),
            read_timeout: config.timeouts.read(),
            write_timeout: config.timeouts.write(),
            grace_period: config.shutdown.grace_period(),
        }
    }
}

/// HTTP server in the `Idle` state.
pub struct HttpServer {
    app: axum::Router,
    settings: ServerSettings,
    state: watch::Sender<ServerState>,
}

impl HttpServer {
    /// Create a new HTTP server around a finished router.
    pub fn new(router: Router, settings: ServerSettings) -> Self {
        let app = Self::build_app(Arc::new(router), &settings);
        let (state, _) = watch::channel(ServerState::Idle);
        Self {
            app,
            settings,
            state,
        }
    }

    /// Build the transport service with all middleware layers.
    #[allow(deprecated)]
    fn build_app(router: Arc<Router>, settings: &ServerSettings) -> axum::Router {
        axum::Router::new()
            .fallback(dispatch)
            .with_state(router)
            .layer(TimeoutLayer::new(settings.write_timeout))
            .layer(RequestBodyTimeoutLayer::new(settings.read_timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Bind the configured address and start serving.
    ///
    /// Returns as soon as the socket is bound; connections are accepted on a
    /// background task.
    pub async fn start(self) -> Result<RunningServer, ServerError> {
        let listener =
            Listener::bind(&self.settings.bind_address, self.settings.max_connections).await?;
        self.serve(listener)
    }

    /// Start serving on an already bound listener.
    pub fn serve(self, listener: Listener) -> Result<RunningServer, ServerError> {
        let local_addr = listener.local_addr().map_err(ListenerError::Accept)?;
        let shutdown = Shutdown::new();
        let tracker = ConnectionTracker::new();
        let state = Arc::new(self.state);

        let accept_loop = AcceptLoop {
            listener,
            app: self.app,
            settings: self.settings.clone(),
            shutdown: shutdown.subscribe(),
            tracker: tracker.clone(),
        };
        let task = tokio::spawn(accept_loop.run());

        state.send_replace(ServerState::Serving);
        tracing::info!(address = %local_addr, "HTTP server serving");

        Ok(RunningServer {
            local_addr,
            shutdown,
            tracker,
            state,
            grace_period: self.settings.grace_period,
            task,
        })
    }
}

/// Terminal handler of the transport stack: hand the request to the router.
async fn dispatch(State(router): State<Arc<Router>>, req: Request<Body>) -> Response {
    router.dispatch(req).await
}

/// Handle to a server in the `Serving` state.
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    tracker: ConnectionTracker,
    state: Arc<watch::Sender<ServerState>>,
    grace_period: Duration,
    task: JoinHandle<Result<(), ServerError>>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle that moves the server to `ShuttingDown` when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Number of open connections.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Serve until shutdown is triggered, then drain.
    ///
    /// Fails if the accept loop dies before anyone asked for a shutdown.
    pub async fn wait(mut self) -> Result<ShutdownOutcome, ServerError> {
        let mut trigger = self.shutdown.subscribe();

        tokio::select! {
            _ = trigger.recv() => {}
            result = &mut self.task => {
                if !self.shutdown.is_triggered() {
                    self.state.send_replace(ServerState::Stopped);
                    return Err(match result {
                        Ok(Ok(())) => ServerError::AcceptLoopExited,
                        Ok(Err(e)) => e,
                        Err(e) => ServerError::Task(e),
                    });
                }
                // Triggered and already drained.
                self.state.send_replace(ServerState::ShuttingDown);
                self.state.send_replace(ServerState::Stopped);
                result??;
                return Ok(ShutdownOutcome::Clean);
            }
        }

        self.drain().await
    }

    /// Trigger shutdown and drain.
    pub async fn shutdown(self) -> Result<ShutdownOutcome, ServerError> {
        self.shutdown.trigger();
        self.wait().await
    }

    async fn drain(mut self) -> Result<ShutdownOutcome, ServerError> {
        self.state.send_replace(ServerState::ShuttingDown);
        let started = Instant::now();
        tracing::info!(
            grace_period_secs = self.grace_period.as_secs_f64(),
            in_flight = self.tracker.active_count(),
            "Shutting down"
        );

        let outcome = match tokio::time::timeout(self.grace_period, &mut self.task).await {
            Ok(result) => {
                let result = result.map_err(ServerError::from).and_then(|r| r);
                if let Err(e) = result {
                    self.state.send_replace(ServerState::Stopped);
                    return Err(e);
                }
                ShutdownOutcome::Clean
            }
            Err(_) => {
                let abandoned = self.tracker.active_count();
                self.task.abort();
                // Wait for the abort so every connection task is gone too.
                let _ = (&mut self.task).await;
                tracing::info!(abandoned, "Grace period elapsed, forcing shutdown");
                ShutdownOutcome::Forced { abandoned }
            }
        };

        self.state.send_replace(ServerState::Stopped);
        tracing::info!(
            outcome = ?outcome,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "HTTP server stopped"
        );
        Ok(outcome)
    }
}

/// The accept loop task and everything it owns.
struct AcceptLoop {
    listener: Listener,
    app: axum::Router,
    settings: ServerSettings,
    shutdown: ShutdownListener,
    tracker: ConnectionTracker,
}

impl AcceptLoop {
    async fn run(mut self) -> Result<(), ServerError> {
        let mut builder = http1::Builder::new();
        // Head reads are bounded by `TimeoutStream`; hyper's own timer would
        // also run between keep-alive requests.
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(None::<Duration>)
            .keep_alive(true);

        // Owning the connection tasks here means aborting this task aborts
        // every connection with it.
        let mut connections = JoinSet::new();
        let mut backoff = AcceptBackoff::new();

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.recv() => break,
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Connection task panicked");
                        }
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        backoff.reset();
                        let guard = self.tracker.track();
                        let span = tracing::debug_span!("connection", id = %guard.id(), peer = %peer);
                        let stream = TimeoutStream::new(
                            stream,
                            self.settings.read_timeout,
                            self.settings.idle_timeout,
                        );
                        let head = stream.request_head();
                        let io = TokioIo::new(stream);
                        let service = TowerToHyperService::new(self.app.clone().map_request(
                            move |req: Request<Incoming>| {
                                head.received();
                                req
                            },
                        ));
                        let builder = builder.clone();
                        let mut shutdown = self.shutdown.clone();

                        connections.spawn(
                            async move {
                                let _permit = permit;
                                let _guard = guard;
                                let conn = builder.serve_connection(io, service);
                                tokio::pin!(conn);

                                let result = tokio::select! {
                                    result = conn.as_mut() => result,
                                    _ = shutdown.recv() => {
                                        conn.as_mut().graceful_shutdown();
                                        conn.as_mut().await
                                    }
                                };
                                if let Err(e) = result {
                                    tracing::debug!(error = %e, "Connection ended with error");
                                }
                            }
                            .instrument(span),
                        );
                    }
                    Err(e) if e.is_transient() => {
                        let delay = backoff.next_delay();
                        tracing::warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "Accept failed, retrying");
                        tokio::time::sleep(delay).await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Accept loop failed");
                        return Err(e.into());
                    }
                },
            }
        }

        // Stop accepting before draining.
        drop(self.listener);
        tracing::info!(in_flight = connections.len(), "Listener closed, draining connections");

        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    tracing::error!(error = %e, "Connection task panicked");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};

    use crate::http::handler_fn;

    fn settings() -> ServerSettings {
        ServerSettings::from(&ServiceConfig::default())
    }

    fn app() -> axum::Router {
        let router = Router::builder()
            .group(Method::GET, |g| g.route("/hello", handler_fn(|_req| async { "hi" })))
            .build()
            .unwrap();
        HttpServer::build_app(Arc::new(router), &settings())
    }

    #[tokio::test]
    async fn transport_stack_dispatches_and_tags_request_id() {
        let res = app()
            .oneshot(Request::get("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn transport_stack_falls_through_to_not_found() {
        let res = app()
            .oneshot(Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn settings_follow_config() {
        let settings = settings();
        assert_eq!(settings.bind_address, "0.0.0.0:9090");
        assert_eq!(settings.idle_timeout, Duration::from_secs(120));
        assert_eq!(settings.read_timeout, Duration::from_secs(1));
        assert_eq!(settings.write_timeout, Duration::from_secs(1));
        assert_eq!(settings.grace_period, Duration::from_secs(30));
    }

    #[test]
    fn new_server_is_idle() {
        let router = Router::builder().build().unwrap();
        let server = HttpServer::new(router, settings());
        assert_eq!(*server.state.borrow(), ServerState::Idle);
    }
}
