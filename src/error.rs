//! Errors surfaced to API clients.
//!
//! Every failure leaving a handler is an [`IntakeError`]. The response body is
//! the standard envelope with a stable machine-readable code; internal detail
//! is logged and never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::collaborators::CollaboratorError;
use crate::http::response::ApiResponse;
use crate::security::csrf::CsrfError;
use crate::session::SessionError;
use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum IntakeError {
    /// Stage 1 or 2 rejected the payload.
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(ValidationErrors),

    /// Stage 3 rejected the payload.
    #[error("business rules rejected {} field(s)", .0.len())]
    BusinessRule(ValidationErrors),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Csrf(#[from] CsrfError),

    #[error("no address for postal code")]
    AddressNotFound,

    /// The address provider failed or timed out.
    #[error("address lookup unavailable")]
    AddressUnavailable,

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("request timed out")]
    RequestTimeout,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntakeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::BusinessRule(_) => "BUSINESS_RULE_VIOLATION",
            Self::Session(SessionError::NotFound) => "SESSION_NOT_FOUND",
            Self::Session(SessionError::Locked | SessionError::Conflict) => "SESSION_LOCKED",
            Self::Csrf(CsrfError::Missing) => "CSRF_TOKEN_MISSING",
            Self::Csrf(CsrfError::Invalid) => "CSRF_TOKEN_INVALID",
            Self::AddressNotFound => "ADDRESS_NOT_FOUND",
            Self::AddressUnavailable => "ADDRESS_LOOKUP_UNAVAILABLE",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::RequestTimeout => "REQUEST_TIMEOUT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BusinessRule(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Session(SessionError::NotFound) | Self::AddressNotFound => StatusCode::NOT_FOUND,
            Self::Session(_) => StatusCode::CONFLICT,
            Self::Csrf(_) => StatusCode::FORBIDDEN,
            Self::AddressUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Some fields need attention.",
            Self::BusinessRule(_) => {
                "Some selected options cannot be provided. Please review your selection."
            }
            Self::Session(SessionError::NotFound) => {
                "Your session has expired or does not exist. Please restart the registration."
            }
            Self::Session(_) => "This registration is already being submitted.",
            Self::AddressNotFound => "No address was found for this postal code.",
            Self::AddressUnavailable => {
                "Address lookup is temporarily unavailable. Please enter your address manually."
            }
            Self::PayloadTooLarge => "The request is too large.",
            Self::RequestTimeout => "The request took too long. Please try again.",
            Self::Csrf(_) => "Access denied.",
            Self::RateLimited => "Too many requests. Please try again later.",
            Self::Internal(_) => "An unexpected error occurred.",
        }
    }
}

impl From<CollaboratorError> for IntakeError {
    fn from(err: CollaboratorError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            tracing::error!(error = %detail, "Request failed");
        }

        let status = self.status();
        let code = self.code();
        let message = self.public_message();
        let details = match self {
            Self::Validation(errors) | Self::BusinessRule(errors) => Some(errors.into_inner()),
            _ => None,
        };

        (status, ApiResponse::<()>::failure(code, message, details)).into_response()
    }
}
