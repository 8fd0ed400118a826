//! Utility functions.

use tokio::sync::mpsc;
use tracing::info;

/// Resolve when the process should stop: Ctrl-C or a message on the
/// shutdown channel (fed by the `/shutdown` endpoint).
pub async fn shutdown_signal(mut shutdown_rx: mpsc::Receiver<()>) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::warn!(error = %err, "ctrl-c handler failed");
            }
            info!("ctrl-c received, shutting down");
        }
        _ = shutdown_rx.recv() => {
            info!("shutdown endpoint hit, shutting down");
        }
    }
}
