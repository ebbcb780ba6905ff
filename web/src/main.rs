//! Canteen HTTP server.

use anyhow::Context;
use axum::{Router, routing::get};
use canteen_engine::metrics::MetricsServer;
use canteen_web::{AppState, Config, bootstrap, build_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        addr = %config.server_addr(),
        postgres = config.postgres.is_some(),
        cas_attempts = config.engine.cas_attempts,
        "Starting canteen server"
    );

    if let Some(addr) = config.metrics_addr() {
        start_metrics(addr).await?;
    }

    let canteen = bootstrap::build_canteen(&config).await?;
    let app = build_router(AppState::new(canteen));

    let listener = tokio::net::TcpListener::bind(config.server_addr())
        .await
        .with_context(|| format!("binding {}", config.server_addr()))?;
    info!(addr = %config.server_addr(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    info!("Server stopped");
    Ok(())
}

/// Install the Prometheus recorder and serve `/metrics` on its own port.
async fn start_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    let mut server = MetricsServer::new(addr);
    server.start()?;
    let server = Arc::new(server);

    let metrics = Router::new().route(
        "/metrics",
        get(move || {
            let server = Arc::clone(&server);
            async move { server.render().unwrap_or_default() }
        }),
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding metrics listener {addr}"))?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, metrics).await {
            warn!(error = %e, "Metrics listener stopped");
        }
    });
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            },
            Err(e) => warn!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
