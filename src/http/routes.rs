//! Public API routes.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::http::handlers;
use crate::http::middleware::csrf_middleware;
use crate::http::server::AppState;
use crate::security::rate_limit::rate_limit_middleware;

pub const CSRF_TOKEN_PATH: &str = "/api/csrf-token";

/// `/api/*` routes with CSRF and rate limiting applied.
///
/// The CSRF layer is outermost, so a request without a valid token never
/// counts against the client's rate window.
pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(CSRF_TOKEN_PATH, get(handlers::issue_csrf_token))
        .route("/api/sessions", post(handlers::create_session))
        .route(
            "/api/sessions/{id}",
            get(handlers::get_session)
                .put(handlers::save_session)
                .delete(handlers::discard_session),
        )
        .route("/api/sessions/{id}/finalize", post(handlers::finalize_session))
        .route("/api/validate", post(handlers::validate))
        .route("/api/address/{postal_code}", get(handlers::lookup_address))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(state, csrf_middleware))
}
