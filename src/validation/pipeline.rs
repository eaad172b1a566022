//! Ordered execution of the three validation stages.

use std::sync::Arc;
use std::time::Duration;

use crate::collaborators::Collaborators;
use crate::config::IntakeConfig;
use crate::observability::metrics;
use crate::submission::DraftSubmission;
use crate::validation::business::BusinessRules;
use crate::validation::cross_field::check_cross_field;
use crate::validation::errors::{PipelineOutcome, Stage, ValidationErrors};
use crate::validation::rules::PlanOptionMatrix;
use crate::validation::syntax::check_syntax;
use crate::validation::ValidationMode;

#[derive(Clone)]
pub struct ValidationPipeline {
    matrix: Arc<PlanOptionMatrix>,
    business: BusinessRules,
}

impl ValidationPipeline {
    pub fn new(matrix: PlanOptionMatrix, business: BusinessRules) -> Self {
        Self {
            matrix: Arc::new(matrix),
            business,
        }
    }

    pub fn from_config(config: &IntakeConfig, collaborators: &Collaborators) -> Self {
        let business = BusinessRules::new(
            collaborators.catalog.clone(),
            collaborators.inventory.clone(),
            collaborators.regions.clone(),
            Duration::from_millis(config.external.timeout_ms),
        );
        Self::new(PlanOptionMatrix::from_config(&config.catalog), business)
    }

    /// Stages 1 and 2.
    pub fn check_local(&self, draft: &DraftSubmission, mode: ValidationMode) -> PipelineOutcome {
        let syntax = check_syntax(draft, mode);
        if !syntax.is_empty() {
            return invalid(Stage::Syntax, syntax);
        }

        let cross = check_cross_field(draft, &self.matrix, mode);
        if !cross.is_empty() {
            return invalid(Stage::CrossField, cross);
        }

        PipelineOutcome::Valid
    }

    /// All three stages in strict mode.
    pub async fn check_all(&self, draft: &DraftSubmission) -> PipelineOutcome {
        self.run(draft, ValidationMode::Strict, true).await
    }

    pub async fn run(
        &self,
        draft: &DraftSubmission,
        mode: ValidationMode,
        include_external: bool,
    ) -> PipelineOutcome {
        let local = self.check_local(draft, mode);
        if !local.is_valid() || !include_external {
            return local;
        }

        let business = self.business.check(draft).await;
        if !business.is_empty() {
            return invalid(Stage::Business, business);
        }

        PipelineOutcome::Valid
    }

    pub fn matrix(&self) -> &PlanOptionMatrix {
        &self.matrix
    }
}

fn invalid(stage: Stage, errors: ValidationErrors) -> PipelineOutcome {
    metrics::record_validation_failure(stage.as_str());
    tracing::debug!(stage = stage.as_str(), fields = errors.len(), "Validation failed");
    PipelineOutcome::Invalid { stage, errors }
}
