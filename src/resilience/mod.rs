//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Transient accept failure (aborted handshake, descriptor exhaustion):
//!     → backoff.rs (wait, doubling up to a cap)
//!     → accept again
//! ```
//!
//! # Design Decisions
//! - Only the accept loop retries; binding never does
//! - Jitter keeps many processes from retrying in lockstep

pub mod backoff;

pub use backoff::{calculate_backoff, AcceptBackoff};
