//! Transit Relay HTTP Server
//!
//! Downloads transit datasets on a schedule, republishes them from a local
//! data directory, and relays rate-limited on-demand details lookups. A
//! `/status` endpoint reports the freshness of every dataset and the health
//! of the details lookup.

pub mod config;
pub mod constants;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod sources;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{DetailsConfig, FeedConfig, RelayConfig, ScriptFeedConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use jobs::{init_services, join_all, start_polling};
pub use middleware::require_relay_key;
pub use routes::create_router;
pub use state::{AppState, DetailsService, DynFetcher, DynSource, PolledService};
