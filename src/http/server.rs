//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared application state from configuration
//! - Create the Axum router with all handlers
//! - Wire up middleware (request ids, tracing, panics, timeouts, limits)
//! - Serve on a plain or TLS listener until shutdown is broadcast

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, response::IntoResponse, response::Response, routing::get, Router};
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::clock::{bounded_seconds, system_clock, SharedClock};
use crate::collaborators::{AddressLookup, Collaborators};
use crate::config::{IntakeConfig, TlsConfig};
use crate::error::IntakeError;
use crate::http::handlers;
use crate::http::middleware::{envelope_transport_errors, in_flight_limit, track_metrics};
use crate::http::routes::api_router;
use crate::net::tls::load_tls_config;
use crate::orchestrator::SubmissionOrchestrator;
use crate::security::headers::security_headers_middleware;
use crate::security::{CsrfGuard, RateLimiter, SharedCsrfGuard};
use crate::session::MemorySessionStore;
use crate::validation::ValidationPipeline;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<IntakeConfig>,
    pub orchestrator: Arc<SubmissionOrchestrator>,
    pub sessions: Arc<MemorySessionStore>,
    pub csrf: SharedCsrfGuard,
    pub rate_limiter: Arc<RateLimiter>,
    pub addresses: Arc<dyn AddressLookup>,
    /// Bounds concurrent requests to `listener.max_connections`.
    pub in_flight: Arc<Semaphore>,
    pub clock: SharedClock,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// State backed by the in-memory collaborators seeded from `config.fixtures`.
    pub fn from_config(config: IntakeConfig, clock: SharedClock) -> Self {
        let collaborators = Collaborators::from_fixtures(&config.fixtures);
        Self::with_collaborators(config, collaborators, clock)
    }

    pub fn with_collaborators(
        config: IntakeConfig,
        collaborators: Collaborators,
        clock: SharedClock,
    ) -> Self {
        let sessions = Arc::new(MemorySessionStore::new(&config.session, clock.clone()));
        let pipeline = ValidationPipeline::from_config(&config, &collaborators);
        let orchestrator = SubmissionOrchestrator::new(
            sessions.clone(),
            pipeline,
            collaborators.repository.clone(),
            bounded_seconds(config.session.ttl_secs),
            clock.clone(),
        );

        Self {
            csrf: Arc::new(CsrfGuard::new(&config.csrf, clock.clone())),
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit.clone(), clock.clone())),
            orchestrator: Arc::new(orchestrator),
            sessions,
            addresses: collaborators.addresses,
            in_flight: Arc::new(Semaphore::new(config.listener.max_connections)),
            started_at: clock.now(),
            clock,
            config: Arc::new(config),
        }
    }

    /// Seconds since the state was built, read from the injected clock.
    pub fn uptime_secs(&self) -> i64 {
        (self.clock.now() - self.started_at).num_seconds()
    }
}

/// HTTP server for the intake API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: IntakeConfig) -> Self {
        Self::with_state(AppState::from_config(config, system_clock()))
    }

    pub fn with_state(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.clone();

        Router::new()
            .merge(api_router(state.clone()))
            .route("/health", get(handlers::health))
            .with_state(state.clone())
            .layer(middleware::from_fn_with_state(
                state.clone(),
                security_headers_middleware,
            ))
            .layer(middleware::from_fn(track_metrics))
            .layer(middleware::from_fn_with_state(state, in_flight_limit))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(CatchPanicLayer::custom(panic_response))
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
            .layer(middleware::map_response(envelope_transport_errors))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let rustls = load_tls_config(tls).await?;
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        let grace = Duration::from_secs(self.state.config.timeouts.request_secs);
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTPS server draining connections");
            drain.graceful_shutdown(Some(grace));
        });

        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    IntakeError::Internal(format!("handler panicked: {detail}")).into_response()
}
