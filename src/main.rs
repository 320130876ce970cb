//! Phonebook server entry point.
//!
//! Reads settings, connects the store, and serves the HTTP API until Ctrl+C.

use anyhow::Context;
use clap::Parser;
use phonebook::server::{serve, shutdown_signal};
use phonebook::{BackendKind, MemoryStore, RedisStore, Settings};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level())),
        )
        .with_target(false)
        .init();

    info!("Phonebook v{} starting", phonebook::VERSION);

    let listener = TcpListener::bind(settings.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_address()))?;

    match settings.backend {
        BackendKind::Redis => {
            let endpoint = settings.endpoint();
            let store = RedisStore::connect(endpoint.clone(), settings.pool_size)
                .await
                .with_context(|| format!("failed to connect to backend at {}", endpoint))?;
            let store = Arc::new(store);

            serve(listener, Arc::clone(&store), shutdown_signal()).await?;
            store.close();
        }
        BackendKind::Memory => {
            warn!("Using the in-memory backend; records are lost on restart");
            serve(listener, Arc::new(MemoryStore::new()), shutdown_signal()).await?;
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
