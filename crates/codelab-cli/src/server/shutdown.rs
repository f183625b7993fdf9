//! Graceful shutdown on SIGTERM or Ctrl+C.

use std::time::Duration;

use tokio::signal;

use crate::TRACING_TARGET_SERVER_SHUTDOWN;

/// Resolves once the process is asked to stop.
///
/// A listener that cannot be installed never resolves, so the other one
/// still governs shutdown.
pub async fn shutdown_signal(shutdown_timeout: Duration) {
    let signal_name = tokio::select! {
        () = interrupt() => "SIGINT",
        () = terminate() => "SIGTERM",
    };

    tracing::info!(
        target: TRACING_TARGET_SERVER_SHUTDOWN,
        signal = signal_name,
        timeout_secs = shutdown_timeout.as_secs(),
        "Shutdown signal received, draining connections"
    );
}

async fn interrupt() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %err,
            "Failed to listen for Ctrl+C"
        );
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %err,
                "Failed to listen for SIGTERM"
            );
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
