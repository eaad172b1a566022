//! Registration intake gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http (request id, trace, limits)
//!                │
//!                ▼
//!            security (CSRF, rate limit)
//!                │
//!                ▼
//!            orchestrator ──▶ validation (syntax → cross-field → business)
//!                │                              │
//!                ▼                              ▼
//!            session store               collaborators
//!                │                   (catalog, inventory, region,
//!                ▼                    address, registrations)
//!            sweeper (periodic cleanup)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use registration_intake::admin::setup_admin_router;
use registration_intake::clock::system_clock;
use registration_intake::config::{load_config, IntakeConfig};
use registration_intake::lifecycle::{spawn_sweepers, wait_for_signal, Shutdown};
use registration_intake::observability::{logging, metrics};
use registration_intake::{AppState, HttpServer};

#[derive(Parser)]
#[command(name = "registration-intake")]
#[command(about = "Registration form intake gateway", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => IntakeConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "registration-intake starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        session_ttl_secs = config.session.ttl_secs,
        external_timeout_ms = config.external.timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let state = AppState::from_config(config.clone(), system_clock());
    if let Err(e) = state.sessions.load_from_file() {
        tracing::warn!(error = %e, "Could not restore session snapshot; starting empty");
    }

    let shutdown = Shutdown::new();
    let sweepers = spawn_sweepers(&state, &config.sweeper, &shutdown);

    let admin = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let router = setup_admin_router(state.clone());
        let mut stop = shutdown.subscribe();
        Some(tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API failed");
            }
        }))
    } else {
        None
    };

    let server = HttpServer::with_state(state.clone());
    let server_task = match &config.listener.tls {
        Some(tls) => {
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            let tls = tls.clone();
            let stop = shutdown.subscribe();
            tokio::spawn(async move { server.run_tls(addr, &tls, stop).await })
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            let stop = shutdown.subscribe();
            tokio::spawn(async move { server.run(listener, stop).await })
        }
    };

    wait_for_signal().await;
    shutdown.trigger();

    match server_task.await {
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
        Ok(Ok(())) => {}
    }
    if let Some(admin) = admin {
        let _ = admin.await;
    }
    for sweeper in sweepers {
        let _ = sweeper.await;
    }

    if let Err(e) = state.sessions.save_to_file() {
        tracing::error!(error = %e, "Failed to save session snapshot");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
