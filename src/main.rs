mod app_state;
mod config;
mod error;
mod fetcher;
mod handlers;
mod models;
mod renderer;
mod routes;
mod telemetry;

use anyhow::Context;
use axum::http::HeaderValue;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use crate::app_state::initialize_state;
use crate::config::Config;
use crate::routes::app_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    telemetry::init_tracing(config.log_format);
    config.validate()?;
    config.print_summary();

    let app_state = initialize_state(&config)?;
    let origin = HeaderValue::from_str(&config.allowed_origin)
        .context("CORS_ORIGIN is not a valid header value")?;
    let app = app_router(app_state, origin);

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Server listening on http://{}", addr);
    info!("Environment: {}", config.environment);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
