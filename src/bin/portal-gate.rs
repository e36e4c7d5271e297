//! Session gate server binary.
//!
//! Main application entry point that wires the token lifecycle components
//! together and starts the HTTP server with graceful shutdown.

use anyhow::Result;
use portal_gate::{
    config::Config,
    http::{AppState, build_router},
    storage::{create_rate_limiter, parse_attempt_store_backend},
};
use std::{env, sync::Arc};

use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "portal_gate=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();

    let version = portal_gate::config::version()?;

    env::args().for_each(|arg| {
        if arg == "--version" || arg == "-V" {
            println!("portal-gate {version}");
            std::process::exit(0);
        }
    });

    tracing::info!(?version, "Starting portal-gate");

    let config = Config::new()?;

    let http_client = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(*config.http_client_timeout.as_ref())
        .build()?;

    // Refresh attempt windows live in memory unless a shared backend is
    // configured for multi-instance deployments
    let backend =
        parse_attempt_store_backend(&config.attempt_store_backend, config.redis_url.as_deref())?;
    let rate_limiter = create_rate_limiter(
        backend,
        *config.refresh_max_attempts.as_ref(),
        *config.refresh_window.as_ref(),
    )?;

    let state = AppState::new(Arc::new(config.clone()), http_client, rate_limiter);
    let app = build_router(state);

    // Graceful shutdown: SIGINT/SIGTERM cancel the token, the tracker drains
    let tracker = TaskTracker::new();
    let cancel = CancellationToken::new();

    {
        let tracker = tracker.clone();
        let cancel = cancel.clone();

        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {},
                _ = terminate => tracing::info!("received SIGTERM, shutting down"),
                _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
            }
            tracker.close();
            cancel.cancel();
        });
    }

    {
        let http_port = *config.http_port.as_ref();
        let cancel = cancel.clone();
        tracker.spawn(async move {
            let bind_address = format!("0.0.0.0:{http_port}");
            tracing::info!("portal-gate listening on {bind_address}");
            let listener = TcpListener::bind(&bind_address).await.unwrap();

            let shutdown = cancel.clone();
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown.cancelled().await;
                    tracing::info!("draining in-flight requests");
                })
                .await;
            if let Err(err) = served {
                tracing::error!(error = %err, "server task failed");
            }

            cancel.cancel();
        });
    }

    tracker.wait().await;

    Ok(())
}
