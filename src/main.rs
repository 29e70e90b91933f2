use anyhow::{Context, Result};
use tracing::{error, info};

use barcodism::api::{self, Limits};
use barcodism::config::Config;
use barcodism::service::store::create_store;
use barcodism::service::BarcodeService;
use barcodism::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    telemetry::init_tracing(config.log_format);

    let store = create_store(&config.storage).await.context("Failed to open barcode storage")?;
    let service = BarcodeService::new(store, config.max_dimension);
    info!(storage = ?config.storage, enabled = service.storage_enabled(), "Storage backend selected");
    let app = api::router(
        service,
        Limits { max_upload_bytes: config.max_upload_bytes, concurrency: config.concurrency_limit },
    );

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, max_dimension = config.max_dimension, "Server ready and accepting connections");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
    info!("Shutting down gracefully...");
}
