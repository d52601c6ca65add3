//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (method group lookup)
//!     → matcher.rs (segment-by-segment pattern match)
//!     → matched route: params into request extensions, run its chain
//!     → no match: 404 (or 405 when enabled)
//!
//! Route Compilation (at startup):
//!     (method, template, handler, middlewares)
//!     → Compile templates (literal and regex-constrained segments)
//!     → Compose middleware chains
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Regex only for explicitly constrained segments
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod matcher;
pub mod router;

pub use matcher::{PathParams, PathPattern, RouteError, UUID_PATTERN};
pub use router::{GroupBuilder, MatchedPath, Router, RouterBuilder};
