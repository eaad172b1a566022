//! Metrics collection and exposition.
//!
//! # Metrics
//! - `intake_requests_total` (counter): requests by method, route, status
//! - `intake_request_duration_seconds` (histogram): latency distribution
//! - `intake_rate_limited_total` (counter): denials by route class
//! - `intake_csrf_rejections_total` (counter): by reason (missing/invalid)
//! - `intake_validation_failures_total` (counter): by stage
//! - `intake_session_events_total` (counter): created/updated/deleted/expired
//! - `intake_sweep_removed_total` (counter): entries removed per sweep kind
//! - `intake_external_calls_total` / `intake_external_call_duration_seconds`
//! - `intake_finalized_total` (counter)
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    counter!("intake_requests_total", &labels).increment(1);
    histogram!("intake_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(class: &'static str) {
    counter!("intake_rate_limited_total", "class" => class).increment(1);
}

pub fn record_csrf_rejection(reason: &'static str) {
    counter!("intake_csrf_rejections_total", "reason" => reason).increment(1);
}

pub fn record_validation_failure(stage: &'static str) {
    counter!("intake_validation_failures_total", "stage" => stage).increment(1);
}

pub fn record_session_event(event: &'static str) {
    counter!("intake_session_events_total", "event" => event).increment(1);
}

pub fn record_active_sessions(count: usize) {
    gauge!("intake_active_sessions").set(count as f64);
}

pub fn record_sweep(kind: &'static str, removed: usize) {
    counter!("intake_sweep_removed_total", "kind" => kind).increment(removed as u64);
}

pub fn record_external_call(provider: &'static str, outcome: &'static str, start: Instant) {
    counter!("intake_external_calls_total", "provider" => provider, "outcome" => outcome)
        .increment(1);
    histogram!("intake_external_call_duration_seconds", "provider" => provider)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_finalized() {
    counter!("intake_finalized_total").increment(1);
}
