//! Draft session storage.
//!
//! # Responsibilities
//! - Hold in-progress submissions under an opaque id with a sliding TTL
//! - Report expired records as missing, whether or not a sweep has run
//! - Latch a session while finalize runs (`transition`)
//! - Snapshot live sessions across restarts

pub mod store;

pub use store::{MemorySessionStore, Session, SessionError, SessionStore, SharedSessionStore};
