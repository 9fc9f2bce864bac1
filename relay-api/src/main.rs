//! Transit Relay Server Entry Point
//!
//! Reads configuration, fetches every dataset once, starts the polling
//! loops, then serves HTTP until interrupted.

use relay_api::{
    create_router, init_services, join_all, start_polling, telemetry::init_tracing, ApiError,
    ApiResult, AppState, RelayConfig,
};
use relay_core::SystemClock;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing()?;

    let config = RelayConfig::from_env()?;
    let state = AppState::from_config(&config, SystemClock::shared())?;

    init_services(&state.polled).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = start_polling(&state.polled, shutdown_rx);

    let addr = config.bind_addr()?;
    tracing::info!(%addr, "Starting transit relay");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    let _ = shutdown_tx.send(true);
    join_all(handles).await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
