//! Submission validation.
//!
//! # Data Flow
//! ```text
//! DraftSubmission
//!     → syntax.rs      (stage 1: per-field rules)
//!     → cross_field.rs (stage 2: correlated fields, plan/option table)
//!     → business.rs    (stage 3: catalog, inventory, region collaborators)
//!     → PipelineOutcome
//! ```
//!
//! # Design Decisions
//! - Stages are ordered; the first stage with errors ends the run
//! - Every check inside a stage runs, so all field errors surface together
//! - Stage 3 fails closed: no answer from a collaborator means "unavailable"

pub mod business;
pub mod cross_field;
pub mod errors;
pub mod pipeline;
pub mod rules;
pub mod syntax;

pub use business::BusinessRules;
pub use errors::{PipelineOutcome, Stage, ValidationErrors};
pub use pipeline::ValidationPipeline;
pub use rules::PlanOptionMatrix;

/// How strictly a payload is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Autosave: empty fields are not yet missing and incomplete groups are skipped.
    Draft,
    /// Validate-only and finalize.
    Strict,
}
