//! HTTP server lifecycle.

use crate::api;
use crate::store::RecordStore;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

/// Serves the API on `listener` until `shutdown` resolves, then waits for
/// in-flight requests to finish.
pub async fn serve<S, F>(listener: TcpListener, store: Arc<S>, shutdown: F) -> std::io::Result<()>
where
    S: RecordStore,
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on {}", addr);
    }

    axum::serve(listener, api::router(store))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl+C.
pub async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, stopping server..."),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            // Never shut down on our own if the handler could not be installed.
            std::future::pending::<()>().await;
        }
    }
}
