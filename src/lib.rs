//! Registration intake gateway library.
//!
//! Accepts multi-screen registration forms, keeps drafts resumable under a
//! time-limited session, validates them in three stages and promotes them to
//! registrations.

pub mod admin;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod orchestrator;
pub mod resilience;
pub mod security;
pub mod session;
pub mod submission;
pub mod validation;

pub use config::schema::IntakeConfig;
pub use error::IntakeError;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
