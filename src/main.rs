use anyhow::Result;
use axum::Router;
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use services::{
    address::AddressScheme, content_store::ContentStore, metadata_index::MetadataIndex,
    object_store::ObjectStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    // --- Logging setup ---
    let default_level = if cfg.is_dev() { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!("Starting blob-local with config: {:?}", cfg);

    // --- Storage ---
    let content = ContentStore::new(cfg.content_dir());
    content.init().await?;
    tracing::info!("Using content directory {}", content.root().display());

    let index = MetadataIndex::open(cfg.index_dir(), cfg.is_dev()).await?;
    let store = ObjectStore::new(content, index, AddressScheme::new(cfg.base_url.clone()));

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(store.clone());

    // --- Start server ---
    let listener = match bind(&cfg).await {
        Ok(listener) => listener,
        Err(err) => {
            store.close().await;
            return Err(err);
        }
    };

    tracing::info!(
        "Server listening on http://{}, public URLs under {}",
        listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| cfg.addr()),
        cfg.base_url
    );
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // --- Release the index exactly once, after in-flight requests drain ---
    store.close().await;
    served?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

/// Bind the configured address, falling back to loopback when a wildcard
/// host is not permitted.
async fn bind(cfg: &config::AppConfig) -> Result<TcpListener> {
    let addr = cfg.addr();
    match TcpListener::bind(&addr).await {
        Ok(listener) => Ok(listener),
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            Ok(TcpListener::bind(&fallback_addr).await?)
        }
        Err(err) => Err(err.into()),
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl-C, shutting down"),
        Err(err) => tracing::warn!("Could not listen for Ctrl-C: {}", err),
    }
}
