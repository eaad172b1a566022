//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming /api request:
//!     → csrf.rs (single-use token on every state-changing request)
//!     → rate_limit.rs (per-client sliding window, per route class)
//!     → handler
//!     → headers.rs (security response headers)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Clients get generic messages; the full context is logged
//! - Token and window state live in explicitly constructed stores

pub mod csrf;
pub mod headers;
pub mod rate_limit;

pub use csrf::{CsrfError, CsrfGuard, IssuedToken, SharedCsrfGuard};
pub use rate_limit::{RateClass, RateLimiter};
