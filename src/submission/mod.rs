//! Registration submission model.
//!
//! # Data Flow
//! ```text
//! wizard JSON (flat field -> string)
//!     → draft.rs (typed groups: phone, postal code, address, plan + options)
//!     → session store (Draft / PendingConfirmation)
//!     → types.rs Registration (committed, terminal)
//! ```

pub mod draft;
pub mod types;

pub use draft::{option_path, Address, DraftSubmission, Field, FlatForm, PhoneNumber, PostalCode};
pub use types::{FinalizeReceipt, Registration, SubmissionState};
