//! Transport setup.

pub mod tls;
