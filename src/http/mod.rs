//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (request id, trace, panic catch, timeout, body limit)
//!     → middleware/ (in-flight limit, metrics, security headers)
//!     → routes.rs (CSRF, rate limit on /api/*)
//!     → handlers.rs → orchestrator
//!     → response.rs (envelope)
//! ```

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;

pub use response::ApiResponse;
pub use server::{AppState, HttpServer};
