//! In-flight request limit.
//!
//! A semaphore sized by `listener.max_connections` bounds concurrent requests.
//! Requests over the limit wait for a slot; the permit is held until the
//! response is produced, so a panicking handler still releases it.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::IntakeError;
use crate::http::server::AppState;

pub async fn in_flight_limit(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let permit = match state.in_flight.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return IntakeError::Internal("request limiter closed".into()).into_response(),
    };

    tracing::trace!(
        available_permits = state.in_flight.available_permits(),
        "Request admitted"
    );
    let response = next.run(request).await;
    drop(permit);
    response
}
