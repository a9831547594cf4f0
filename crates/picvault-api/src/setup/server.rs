//! Server startup and graceful shutdown

use super::App;
use anyhow::Result;
use picvault_core::Config;
use std::time::Duration;

/// How long queued archive copies get to reach the sink after the server stops.
const ARCHIVE_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Start the server; on shutdown, drain and stop the archive pipeline.
pub async fn start_server(config: &Config, app: App) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        max_upload_mb = config.max_upload_size_bytes / 1024 / 1024,
        hosting_timeout_secs = config.hosting_timeout.as_secs(),
        "Server ready and accepting connections"
    );

    axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(archive) = app.archive {
        let stats = archive.shutdown(ARCHIVE_DRAIN_TIMEOUT).await;
        tracing::info!(
            processed = stats.processed,
            dropped = stats.dropped,
            failed = stats.failed,
            "Archive pipeline stopped"
        );
    }

    Ok(())
}

/// Signal handler for graceful shutdown
///
/// Listens for Ctrl+C (SIGINT) and SIGTERM.
///
/// # Panics
/// Panics if a signal handler cannot be installed (unrecoverable system error).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
