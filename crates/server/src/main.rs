//! fourcut server entry point.

use std::sync::Arc;

use fourcut_common::Config;
use fourcut_server::{AppServices, init_tracing};
use tokio::signal;
use tracing::info;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, shutting down...");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = match args.iter().position(|arg| arg == "--config") {
        Some(i) => {
            let path = args
                .get(i + 1)
                .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
            Config::from_file(path)?
        }
        None => Config::load()?,
    };
    init_tracing(&config);

    info!("Starting fourcut...");

    let db = fourcut_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    fourcut_db::migrate(&db).await?;
    info!("Migrations completed");

    if args.iter().any(|arg| arg == "--migrate-only") {
        return Ok(());
    }

    let services = AppServices::build(Arc::new(db), &config);
    info!(
        search_limit = config.friendship.search_limit,
        storage = %config.storage.base_path.display(),
        "Services ready"
    );

    shutdown_signal().await;
    drop(services);

    info!("Shutdown complete");
    Ok(())
}
