//! Wraps transport-level rejections in the API envelope.
//!
//! The body limit and timeout layers answer with bare 413 and 408 responses.
//! Those are rebuilt as [`IntakeError`] envelopes, keeping the original
//! headers (request id, security headers).

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::IntakeError;

pub async fn envelope_transport_errors(response: Response) -> Response {
    let error = match response.status() {
        StatusCode::PAYLOAD_TOO_LARGE => IntakeError::PayloadTooLarge,
        StatusCode::REQUEST_TIMEOUT => IntakeError::RequestTimeout,
        _ => return response,
    };
    if is_json(&response) {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    let (enveloped, body) = error.into_response().into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    if let Some(content_type) = enveloped.headers.get(header::CONTENT_TYPE) {
        parts.headers.insert(header::CONTENT_TYPE, content_type.clone());
    }
    Response::from_parts(parts, body)
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}
