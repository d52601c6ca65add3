//! Connection lifecycle tracking and idle enforcement.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Count open connections (reported on forced shutdown)
//! - Bound how long a request head may take to arrive (read timeout)
//! - Close keep-alive connections that see no traffic between requests
//!   (idle timeout)
//!
//! # Deadlines
//! ```text
//! accept ──▶ Head (read deadline, fixed) ──request handed to router──▶ Open (idle deadline, sliding)
//!              ▲                                                          │
//!              └────────── first bytes after a response was written ──────┘
//! ```

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep};

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Counts connections that are currently open.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new open connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        let count = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_active_connections(count);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
        }
    }

    /// Get current open connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped, including when the connection task
/// is aborted.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let count = self.active_count.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_active_connections(count);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

/// Shared flag telling a [`TimeoutStream`] that the request head it was
/// waiting for has been parsed and handed on.
#[derive(Debug, Clone)]
pub struct RequestHead {
    awaiting: Arc<AtomicBool>,
}

impl RequestHead {
    /// The head arrived; the read deadline no longer applies.
    pub fn received(&self) {
        self.awaiting.store(false, Ordering::Release);
    }

    fn expect(&self) {
        self.awaiting.store(true, Ordering::Release);
    }

    fn is_awaited(&self) -> bool {
        self.awaiting.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for a request head; fixed `read` deadline.
    Head,
    /// Request in progress or connection idle; `idle` deadline slides with
    /// traffic.
    Open { wrote: bool },
}

/// Stream wrapper enforcing the read and idle timeouts of a connection.
///
/// A request head must arrive within `read` of its first byte (of the
/// accept, for the first request). Between requests, and while one is being
/// served, the connection fails with `TimedOut` once no bytes moved for
/// `idle`.
#[derive(Debug)]
pub struct TimeoutStream<S> {
    inner: S,
    read: Duration,
    idle: Duration,
    phase: Phase,
    head: RequestHead,
    deadline: Pin<Box<Sleep>>,
}

impl<S> TimeoutStream<S> {
    pub fn new(inner: S, read: Duration, idle: Duration) -> Self {
        Self {
            inner,
            read,
            idle,
            phase: Phase::Head,
            head: RequestHead {
                awaiting: Arc::new(AtomicBool::new(true)),
            },
            deadline: Box::pin(tokio::time::sleep(read)),
        }
    }

    /// Handle the HTTP service uses to report a parsed request head.
    pub fn request_head(&self) -> RequestHead {
        self.head.clone()
    }

    fn arm(&mut self, after: Duration) {
        self.deadline.as_mut().reset(Instant::now() + after);
    }

    /// Leave `Head` once the service has taken the request.
    fn sync(&mut self) {
        if self.phase == Phase::Head && !self.head.is_awaited() {
            self.phase = Phase::Open { wrote: false };
            self.arm(self.idle);
        }
    }

    fn on_read(&mut self) {
        match self.phase {
            Phase::Head => {}
            Phase::Open { wrote: true } => {
                // Next request on a keep-alive connection.
                self.phase = Phase::Head;
                self.head.expect();
                self.arm(self.read);
            }
            Phase::Open { wrote: false } => self.arm(self.idle),
        }
    }

    fn on_write(&mut self) {
        // Covers responses hyper writes itself, e.g. 400 for a bad head.
        self.head.received();
        self.phase = Phase::Open { wrote: true };
        self.arm(self.idle);
    }

    fn poll_deadline<T>(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<T>> {
        match self.deadline.as_mut().poll(cx) {
            Poll::Ready(()) => {
                let message = match self.phase {
                    Phase::Head => "request head read timeout",
                    Phase::Open { .. } => "connection idle timeout",
                };
                Poll::Ready(Err(io::Error::new(io::ErrorKind::TimedOut, message)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for TimeoutStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        this.sync();
        let before = buf.filled().len();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                if buf.filled().len() > before {
                    this.on_read();
                }
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => this.poll_deadline(cx),
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for TimeoutStream<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        this.sync();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                if n > 0 {
                    this.on_write();
                }
                Poll::Ready(Ok(n))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => this.poll_deadline(cx),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
