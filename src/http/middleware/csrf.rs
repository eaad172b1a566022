//! Anti-forgery enforcement on state-changing requests.
//!
//! Safe methods pass through. Anything else must carry a live token in
//! `X-CSRF-Token`; the token is consumed and a fresh one is returned in the
//! same header on the response.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::IntakeError;
use crate::http::server::AppState;
use crate::security::CsrfError;
use crate::observability::metrics;

pub const CSRF_HEADER: &str = "x-csrf-token";

pub async fn csrf_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method().is_safe() {
        return next.run(request).await;
    }

    // A header that is present but not visible ASCII was still sent.
    let redeemed = match request.headers().get(CSRF_HEADER).map(HeaderValue::to_str) {
        Some(Err(_)) => Err(CsrfError::Invalid),
        Some(Ok(token)) => state.csrf.redeem(Some(token)),
        None => state.csrf.redeem(None),
    };

    if let Err(e) = redeemed {
        let client = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        tracing::warn!(
            client = %client,
            method = %request.method(),
            path = %request.uri().path(),
            reason = e.as_str(),
            "CSRF check failed"
        );
        metrics::record_csrf_rejection(e.as_str());
        return IntakeError::from(e).into_response();
    }

    let mut response = next.run(request).await;
    let rotated = state.csrf.issue_token();
    if let Ok(value) = HeaderValue::from_str(&rotated.token) {
        response.headers_mut().insert(CSRF_HEADER, value);
    }
    response
}
