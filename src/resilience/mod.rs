//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an external collaborator:
//!     → timeouts.rs (enforce the per-call deadline)
//!     → On timeout or error: caller treats the answer as "unavailable"
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: a validation request must answer within its budget
//! - Timeout errors are distinct from other collaborator errors

pub mod timeouts;

pub use timeouts::with_deadline;
