//! Periodic cleanup of expired state.
//!
//! One task per store on its own interval. Ticks missed while the runtime was
//! busy are skipped rather than replayed; a late sweep just removes more.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::SweeperConfig;
use crate::http::server::AppState;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::session::SessionStore;

/// Entries removed by one pass over every store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub sessions: usize,
    pub csrf_tokens: usize,
    pub rate_limit_keys: usize,
    pub finalize_receipts: usize,
}

/// Sweep every store once.
pub fn sweep_once(state: &AppState) -> SweepReport {
    let report = SweepReport {
        sessions: state.sessions.sweep_expired(),
        csrf_tokens: state.csrf.sweep_expired(),
        rate_limit_keys: state.rate_limiter.sweep(),
        finalize_receipts: state.orchestrator.receipts().sweep_expired(),
    };
    metrics::record_sweep("session", report.sessions);
    metrics::record_sweep("csrf", report.csrf_tokens);
    metrics::record_sweep("rate_limit", report.rate_limit_keys);
    metrics::record_sweep("receipt", report.finalize_receipts);
    report
}

/// Start the periodic sweepers. Returns no handles when disabled.
pub fn spawn_sweepers(state: &AppState, config: &SweeperConfig, shutdown: &Shutdown) -> Vec<JoinHandle<()>> {
    if !config.enabled {
        tracing::info!("Background sweepers disabled");
        return Vec::new();
    }

    let sessions = state.sessions.clone();
    let csrf = state.csrf.clone();
    let limiter = state.rate_limiter.clone();
    let receipts = state.orchestrator.receipts().clone();

    vec![
        spawn_periodic(
            "session",
            Duration::from_secs(config.session_interval_secs),
            shutdown.subscribe(),
            move || sessions.sweep_expired(),
        ),
        spawn_periodic(
            "csrf",
            Duration::from_secs(config.csrf_interval_secs),
            shutdown.subscribe(),
            move || csrf.sweep_expired(),
        ),
        spawn_periodic(
            "rate_limit",
            Duration::from_secs(config.rate_limit_interval_secs),
            shutdown.subscribe(),
            move || limiter.sweep(),
        ),
        spawn_periodic(
            "receipt",
            Duration::from_secs(config.receipt_interval_secs),
            shutdown.subscribe(),
            move || receipts.sweep_expired(),
        ),
    ]
}

fn spawn_periodic<F>(
    kind: &'static str,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
    sweep: F,
) -> JoinHandle<()>
where
    F: Fn() -> usize + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; there is nothing to sweep yet.
        ticker.tick().await;
        tracing::debug!(kind, interval_secs = every.as_secs(), "Sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = sweep();
                    metrics::record_sweep(kind, removed);
                    if removed > 0 {
                        tracing::debug!(kind, removed, "Swept expired entries");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!(kind, "Sweeper stopping");
                    break;
                }
            }
        }
    })
}
