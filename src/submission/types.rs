//! Submission lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::submission::draft::DraftSubmission;

/// Where a stored session sits in the finalize state machine.
///
/// `Finalized` is never stored: the session is deleted once the registration
/// has been committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    /// Editable; autosave allowed.
    Draft,
    /// A finalize call holds the session while stage 3 runs.
    PendingConfirmation,
}

impl SubmissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingConfirmation => "pending_confirmation",
        }
    }
}

/// The committed registration entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    /// Session the registration was promoted from.
    pub session_id: String,
    pub submission: DraftSubmission,
    pub finalized_at: DateTime<Utc>,
}

/// Answer to a successful finalize call, replayed on retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeReceipt {
    pub session_id: String,
    pub registration_id: Uuid,
    pub finalized_at: DateTime<Utc>,
}
