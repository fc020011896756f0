//! Graceful shutdown on SIGTERM/SIGINT.
//!
//! Both listeners are drained together: once a signal arrives neither accepts
//! new connections, and in-flight ones get [`SHUTDOWN_GRACE`] to finish.

use std::time::Duration;

use axum_server::Handle;

/// How long open connections may keep running after a shutdown signal
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Setup graceful shutdown of every listener in `handles` on SIGTERM and SIGINT.
pub fn setup_shutdown_handler(handles: Vec<Handle>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
        }

        for handle in &handles {
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
        tracing::info!(
            listeners = handles.len(),
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "Graceful shutdown initiated"
        );
    });
}
