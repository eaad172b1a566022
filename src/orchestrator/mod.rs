//! Submission orchestration.
//!
//! # Data Flow
//! ```text
//! start_draft / save_draft → stages 1-2 (draft mode) → SessionStore
//! validate                 → stages 1-2 (+3 on request), strict
//! finalize:
//!     receipt cache hit?           → replay receipt
//!     Draft → PendingConfirmation  (CAS; a second caller gets a conflict)
//!     stages 1-3 strict            (failure: back to Draft, values intact)
//!     RegistrationRepository       (failure: back to Draft)
//!     record receipt, delete session
//! ```

pub mod receipts;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::clock::SharedClock;
use crate::collaborators::RegistrationRepository;
use crate::error::IntakeError;
use crate::observability::metrics;
use crate::session::{Session, SessionStore, SharedSessionStore};
use crate::submission::{DraftSubmission, FinalizeReceipt, Registration, SubmissionState};
use crate::validation::{PipelineOutcome, Stage, ValidationMode, ValidationPipeline};

pub use receipts::ReceiptCache;

/// Returns a session to `Draft` unless disarmed.
///
/// Held across the awaits of finalize, so an early return, a panic or the
/// request future being dropped all release the latch.
struct PendingGuard<'a> {
    sessions: &'a dyn SessionStore,
    session_id: &'a str,
    armed: bool,
}

impl<'a> PendingGuard<'a> {
    fn new(sessions: &'a dyn SessionStore, session_id: &'a str) -> Self {
        Self {
            sessions,
            session_id,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.sessions.transition(
            self.session_id,
            SubmissionState::PendingConfirmation,
            SubmissionState::Draft,
        ) {
            Ok(_) => tracing::debug!(session_id = %self.session_id, "Session returned to draft"),
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "Could not release session")
            }
        }
    }
}

/// Moves submissions from draft to registration.
pub struct SubmissionOrchestrator {
    sessions: SharedSessionStore,
    pipeline: ValidationPipeline,
    repository: Arc<dyn RegistrationRepository>,
    receipts: Arc<ReceiptCache>,
    clock: SharedClock,
}

impl SubmissionOrchestrator {
    pub fn new(
        sessions: SharedSessionStore,
        pipeline: ValidationPipeline,
        repository: Arc<dyn RegistrationRepository>,
        receipt_ttl: Duration,
        clock: SharedClock,
    ) -> Self {
        Self {
            sessions,
            pipeline,
            repository,
            receipts: Arc::new(ReceiptCache::new(receipt_ttl, clock.clone())),
            clock,
        }
    }

    pub fn receipts(&self) -> &Arc<ReceiptCache> {
        &self.receipts
    }

    /// Check a partial payload and open a session for it.
    pub fn start_draft(&self, payload: DraftSubmission) -> Result<Session, IntakeError> {
        self.check_draft(&payload)?;
        let session = self.sessions.create(payload);
        tracing::info!(session_id = %session.id, "Draft started");
        Ok(session)
    }

    /// Autosave. Returns the new expiry.
    pub fn save_draft(&self, id: &str, payload: DraftSubmission) -> Result<DateTime<Utc>, IntakeError> {
        self.sessions.get(id)?;
        self.check_draft(&payload)?;
        Ok(self.sessions.update(id, payload)?)
    }

    pub fn load_draft(&self, id: &str) -> Result<Session, IntakeError> {
        Ok(self.sessions.get(id)?)
    }

    pub fn discard_draft(&self, id: &str) -> Result<(), IntakeError> {
        self.sessions.delete(id)?;
        tracing::info!(session_id = %id, "Draft discarded");
        Ok(())
    }

    /// Strict validation without touching any session.
    pub async fn validate(&self, payload: &DraftSubmission, include_external: bool) -> PipelineOutcome {
        self.pipeline
            .run(payload, ValidationMode::Strict, include_external)
            .await
    }

    pub async fn finalize(&self, id: &str) -> Result<FinalizeReceipt, IntakeError> {
        if let Some(receipt) = self.receipts.get(id) {
            tracing::info!(session_id = %id, "Replaying finalize receipt");
            return Ok(receipt);
        }

        let session = self.sessions.transition(
            id,
            SubmissionState::Draft,
            SubmissionState::PendingConfirmation,
        )?;
        let guard = PendingGuard::new(self.sessions.as_ref(), id);

        match self.pipeline.check_all(&session.payload).await {
            PipelineOutcome::Valid => {}
            PipelineOutcome::Invalid {
                stage: Stage::Business,
                errors,
            } => {
                tracing::info!(session_id = %id, "Finalize rejected by business rules");
                return Err(IntakeError::BusinessRule(errors));
            }
            PipelineOutcome::Invalid { errors, .. } => return Err(IntakeError::Validation(errors)),
        }

        let registration = Registration {
            id: Uuid::new_v4(),
            session_id: id.to_string(),
            submission: session.payload,
            finalized_at: self.clock.now(),
        };
        let registration_id = self.repository.commit(&registration).await?;

        let receipt = FinalizeReceipt {
            session_id: id.to_string(),
            registration_id,
            finalized_at: registration.finalized_at,
        };
        self.receipts.insert(receipt.clone());
        guard.disarm();

        if let Err(e) = self.sessions.delete(id) {
            tracing::warn!(session_id = %id, error = %e, "Finalized session already gone");
        }
        metrics::record_finalized();
        tracing::info!(
            session_id = %id,
            registration_id = %registration_id,
            "Registration finalized"
        );
        Ok(receipt)
    }

    fn check_draft(&self, payload: &DraftSubmission) -> Result<(), IntakeError> {
        match self.pipeline.check_local(payload, ValidationMode::Draft) {
            PipelineOutcome::Valid => Ok(()),
            PipelineOutcome::Invalid { errors, .. } => Err(IntakeError::Validation(errors)),
        }
    }
}
