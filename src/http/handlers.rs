//! Handlers for the public API.

use std::time::Duration;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collaborators::PostalAddress;
use crate::error::IntakeError;
use crate::http::response::ApiResponse;
use crate::http::server::AppState;
use crate::resilience::with_deadline;
use crate::security::csrf::IssuedToken;
use crate::session::Session;
use crate::submission::{DraftSubmission, FinalizeReceipt, FlatForm, SubmissionState};
use crate::validation::{PipelineOutcome, Stage, ValidationErrors};

type ApiResult<T> = Result<ApiResponse<T>, IntakeError>;

#[derive(Debug, Serialize)]
pub struct SessionTicket {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub state: SubmissionState,
    pub payload: FlatForm,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Session> for SessionView {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            state: session.state,
            payload: session.payload.to_flat(),
            created_at: session.created_at,
            updated_at: session.updated_at,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Validity {
    pub valid: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateQuery {
    #[serde(default)]
    pub external: bool,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub uptime_secs: i64,
}

/// Turn a body rejection into a field-level validation error.
fn payload(body: Result<Json<DraftSubmission>, JsonRejection>) -> Result<DraftSubmission, IntakeError> {
    match body {
        Ok(Json(draft)) => Ok(draft),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected request body");
            let mut errors = ValidationErrors::new();
            errors.add("body", "must be a JSON object of text fields");
            Err(IntakeError::Validation(errors))
        }
    }
}

pub async fn health(State(state): State<AppState>) -> ApiResponse<Health> {
    ApiResponse::ok(Health {
        status: "ok",
        uptime_secs: state.uptime_secs(),
    })
}

pub async fn issue_csrf_token(State(state): State<AppState>) -> ApiResponse<IssuedToken> {
    ApiResponse::ok(state.csrf.issue_token())
}

pub async fn create_session(
    State(state): State<AppState>,
    body: Result<Json<DraftSubmission>, JsonRejection>,
) -> Result<(StatusCode, ApiResponse<SessionTicket>), IntakeError> {
    let session = state.orchestrator.start_draft(payload(body)?)?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(SessionTicket {
            session_id: session.id,
            expires_at: session.expires_at,
        }),
    ))
}

pub async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionView> {
    let session = state.orchestrator.load_draft(&id)?;
    Ok(ApiResponse::ok(session.into()))
}

pub async fn save_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<DraftSubmission>, JsonRejection>,
) -> ApiResult<SessionTicket> {
    let expires_at = state.orchestrator.save_draft(&id, payload(body)?)?;
    Ok(ApiResponse::ok(SessionTicket {
        session_id: id,
        expires_at,
    }))
}

pub async fn discard_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.orchestrator.discard_draft(&id)?;
    Ok(ApiResponse::ok(()))
}

pub async fn validate(
    State(state): State<AppState>,
    query: Result<Query<ValidateQuery>, QueryRejection>,
    body: Result<Json<DraftSubmission>, JsonRejection>,
) -> ApiResult<Validity> {
    let Query(query) = query.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected query string");
        let mut errors = ValidationErrors::new();
        errors.add("external", "must be true or false");
        IntakeError::Validation(errors)
    })?;
    let draft = payload(body)?;
    match state.orchestrator.validate(&draft, query.external).await {
        PipelineOutcome::Valid => Ok(ApiResponse::ok(Validity { valid: true })),
        PipelineOutcome::Invalid {
            stage: Stage::Business,
            errors,
        } => Err(IntakeError::BusinessRule(errors)),
        PipelineOutcome::Invalid { errors, .. } => Err(IntakeError::Validation(errors)),
    }
}

pub async fn finalize_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<FinalizeReceipt> {
    Ok(ApiResponse::ok(state.orchestrator.finalize(&id).await?))
}

pub async fn lookup_address(
    State(state): State<AppState>,
    Path(postal_code): Path<String>,
) -> ApiResult<PostalAddress> {
    let normalized: String = postal_code.chars().filter(|c| *c != '-').collect();
    if normalized.len() != 7 || !normalized.chars().all(|c| c.is_ascii_digit()) {
        let mut errors = ValidationErrors::new();
        errors.add("postal_code", "must be 7 digits");
        return Err(IntakeError::Validation(errors));
    }

    let deadline = Duration::from_millis(state.config.external.timeout_ms);
    let found = with_deadline(
        "address",
        deadline,
        state.addresses.search_by_postal_code(&normalized),
    )
    .await
    .map_err(|_| IntakeError::AddressUnavailable)?;
    found.map(ApiResponse::ok).ok_or(IntakeError::AddressNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use futures_util::future::{self, BoxFuture, FutureExt};

    use crate::clock::ManualClock;
    use crate::collaborators::{AddressLookup, CollaboratorError, CollaboratorResult, Collaborators};
    use crate::config::IntakeConfig;

    struct UnreachableAddressBook;

    impl AddressLookup for UnreachableAddressBook {
        fn search_by_postal_code<'a>(
            &'a self,
            _code: &'a str,
        ) -> BoxFuture<'a, CollaboratorResult<Option<PostalAddress>>> {
            future::ready(Err(CollaboratorError::Unavailable("connection refused".into()))).boxed()
        }
    }

    fn state_with(clock: &ManualClock, addresses: Option<Arc<dyn AddressLookup>>) -> AppState {
        let config = IntakeConfig::default();
        let mut collaborators = Collaborators::from_fixtures(&config.fixtures);
        if let Some(addresses) = addresses {
            collaborators.addresses = addresses;
        }
        AppState::with_collaborators(config, collaborators, Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn test_health_uptime_follows_injected_clock() {
        let clock = ManualClock::default();
        let state = state_with(&clock, None);
        clock.advance(chrono::Duration::seconds(90));

        let response = health(State(state)).await;
        let data = response.data.unwrap();
        assert_eq!(data.status, "ok");
        assert_eq!(data.uptime_secs, 90);
    }

    #[tokio::test]
    async fn test_address_provider_failure_is_unavailable() {
        let clock = ManualClock::default();
        let state = state_with(&clock, Some(Arc::new(UnreachableAddressBook)));

        let err = lookup_address(State(state), Path("100-0001".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::AddressUnavailable));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_address_lookup_found_and_missing() {
        let clock = ManualClock::default();
        let state = state_with(&clock, None);

        let found = lookup_address(State(state.clone()), Path("1000001".to_string()))
            .await
            .unwrap();
        assert_eq!(found.data.unwrap().prefecture, "東京都");

        let err = lookup_address(State(state), Path("9999999".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::AddressNotFound));
    }
}
