//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Restore sessions → Spawn sweepers → Serve
//!
//! Shutdown (shutdown.rs + signals.rs):
//!     SIGTERM/SIGINT → Broadcast → Stop accepting → Drain → Save sessions
//!
//! Sweeper (sweeper.rs):
//!     One periodic task per store, stopped by the shutdown broadcast
//! ```
//!
//! # Design Decisions
//! - Every long-running task subscribes to the same broadcast
//! - Sweeps are hygiene only; reads never depend on them having run

pub mod shutdown;
pub mod signals;
pub mod sweeper;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use sweeper::{spawn_sweepers, sweep_once, SweepReport};
