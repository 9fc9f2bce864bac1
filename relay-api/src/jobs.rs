//! Background polling jobs.
//!
//! Every scheduled dataset is fetched once at startup, then handed to its
//! own polling loop:
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! init_services(&state.polled).await?;
//! let handles = start_polling(&state.polled, shutdown_rx);
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! ```

use std::sync::Arc;

use relay_core::RelayResult;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::state::PolledService;

/// Fetch every dataset once, in order. The first failure is fatal.
pub async fn init_services(services: &[Arc<PolledService>]) -> RelayResult<()> {
    for service in services {
        service.init().await?;
    }
    tracing::info!(services = services.len(), "Initial downloads complete");
    Ok(())
}

/// Spawn one polling loop per dataset.
pub fn start_polling(
    services: &[Arc<PolledService>],
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    services
        .iter()
        .map(|service| Arc::clone(service).start(shutdown.clone()))
        .collect()
}

/// Wait for every polling loop to stop.
pub async fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Polling task ended abnormally");
        }
    }
}
