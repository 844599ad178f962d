//! Serve command - runs the prediction API until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use object_store::ObjectStore;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::app_context::AppContext;
use crate::web::router;

/// Runs the serve command.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run(store: Arc<dyn ObjectStore>, bind_addr: SocketAddr) -> Result<()> {
    let context = Arc::new(AppContext::initialize(store).await);
    let app = router(Arc::clone(&context));

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;

    info!(%bind_addr, model_ready = context.is_ready(), "Prediction API listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    context.log_writer.shutdown().await;
    info!("Prediction log flushed");

    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
