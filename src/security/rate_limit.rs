//! Sliding-window-log rate limiting middleware.
//!
//! Each client key keeps the timestamps of its admitted requests inside the
//! trailing window. A request is admitted while fewer than `limit` remain;
//! only admitted requests are recorded, so a denied burst does not push the
//! window forward.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Mutex;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};

use crate::clock::{bounded_seconds, SharedClock};
use crate::config::RateLimitConfig;
use crate::error::IntakeError;
use crate::http::routes::CSRF_TOKEN_PATH;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Route classes with independent limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateClass {
    /// Token issuance, drafts, validate-only.
    Standard,
    /// The authoritative finalize transition.
    Finalize,
}

impl RateClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Finalize => "finalize",
        }
    }

    /// Class guarding a request, or `None` for unmetered reads.
    pub fn for_request(method: &Method, path: &str) -> Option<Self> {
        if path.ends_with("/finalize") {
            Some(Self::Finalize)
        } else if !method.is_safe() || path == CSRF_TOKEN_PATH {
            Some(Self::Standard)
        } else {
            None
        }
    }
}

/// Per-key sliding-window admission control.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
    config: RateLimitConfig,
    clock: SharedClock,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: SharedClock) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            config,
            clock,
        }
    }

    /// Admit one request for `key` if fewer than `limit` were admitted in the
    /// trailing `window`.
    pub fn allow(&self, key: &str, limit: u32, window: Duration) -> bool {
        let now = self.clock.now();
        let cutoff = now - window;

        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
        let log = windows.entry(key.to_string()).or_default();
        while log.front().is_some_and(|t| *t <= cutoff) {
            log.pop_front();
        }

        if log.len() < limit as usize {
            log.push_back(now);
            true
        } else {
            false
        }
    }

    /// Apply the configured policy for `class`.
    pub fn admit(&self, client: &str, class: RateClass) -> bool {
        if !self.config.enabled {
            return true;
        }
        let (limit, window) = self.policy(class);
        self.allow(&format!("{}:{}", class.as_str(), client), limit, window)
    }

    fn policy(&self, class: RateClass) -> (u32, Duration) {
        match class {
            RateClass::Standard => (self.config.limit, bounded_seconds(self.config.window_secs)),
            RateClass::Finalize => (
                self.config.finalize_limit,
                bounded_seconds(self.config.finalize_window_secs),
            ),
        }
    }

    /// Remove keys with no timestamps inside the longest configured window.
    pub fn sweep(&self) -> usize {
        let longest = self.config.window_secs.max(self.config.finalize_window_secs);
        self.sweep_older_than(bounded_seconds(longest))
    }

    /// Prune every log to `window` and drop the keys left empty.
    pub fn sweep_older_than(&self, window: Duration) -> usize {
        let cutoff = self.clock.now() - window;
        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
        let before = windows.len();
        windows.retain(|_, log| {
            while log.front().is_some_and(|t| *t <= cutoff) {
                log.pop_front();
            }
            !log.is_empty()
        });
        before - windows.len()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.windows.lock().expect("rate limiter mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let Some(class) = RateClass::for_request(request.method(), request.uri().path()) else {
        return next.run(request).await;
    };

    if state.rate_limiter.admit(&client, class) {
        next.run(request).await
    } else {
        tracing::warn!(
            client = %client,
            class = class.as_str(),
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        metrics::record_rate_limited(class.as_str());
        IntakeError::RateLimited.into_response()
    }
}
