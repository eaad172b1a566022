//! Request middleware for the public API.

pub mod backpressure;
pub mod csrf;
pub mod envelope;
pub mod metrics;

pub use backpressure::in_flight_limit;
pub use csrf::{csrf_middleware, CSRF_HEADER};
pub use envelope::envelope_transport_errors;
pub use metrics::track_metrics;
