use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::lifecycle::sweeper::{sweep_once, SweepReport};
use crate::session::SessionStore;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: i64,
}

#[derive(Serialize)]
pub struct StoreStats {
    pub sessions: usize,
    pub csrf_tokens: usize,
    pub rate_limit_keys: usize,
    pub finalize_receipts: usize,
    pub available_request_slots: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.uptime_secs(),
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StoreStats> {
    Json(StoreStats {
        sessions: state.sessions.len(),
        csrf_tokens: state.csrf.len(),
        rate_limit_keys: state.rate_limiter.len(),
        finalize_receipts: state.orchestrator.receipts().len(),
        available_request_slots: state.in_flight.available_permits(),
    })
}

/// Run every sweep now instead of waiting for the timers.
pub async fn post_sweep(State(state): State<AppState>) -> Json<SweepReport> {
    let report = sweep_once(&state);
    tracing::info!(?report, "Manual sweep completed");
    Json(report)
}
