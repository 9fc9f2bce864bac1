//! Constants for the relay server
//!
//! Defaults for every environment variable read by [`crate::config`], plus
//! the names and file names of the built-in services.

// ============================================================================
// SERVER
// ============================================================================

/// Default listening port
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind host
pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Directory persisted datasets are written to and served from
pub const DEFAULT_DATA_DIR: &str = "data";

/// Base URL datasets are republished under
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";

/// Timeout applied to every upstream HTTP request
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Header carrying the shared relay key
pub const RELAY_KEY_HEADER: &str = "relay-key";

// ============================================================================
// SCHEDULED SERVICES
// ============================================================================

pub const GTFS_SERVICE: &str = "GTFS";
pub const DEFAULT_GTFS_REFRESH_HOURS: u64 = 6;
pub const DEFAULT_GTFS_DOWNLOAD_SCRIPT: &str = "scripts/download-gtfs.sh";

/// Prefix of the script output line carrying the archive hash
pub const GTFS_HASH_LINE_PREFIX: &str = "The hash is:";

pub const GTFS_REALTIME_SERVICE: &str = "GTFS-R";
pub const GTFS_REALTIME_FILE: &str = "gtfs-realtime.json";
pub const GTFS_REALTIME_KEY_HEADER: &str = "KeyId";
pub const DEFAULT_GTFS_REALTIME_REFRESH_SECONDS: u64 = 30;

pub const PTV_DISRUPTIONS_SERVICE: &str = "PTV Disruptions";
pub const PTV_DISRUPTIONS_FILE: &str = "ptv-disruptions.json";
pub const DEFAULT_PTV_DISRUPTIONS_REFRESH_MINUTES: u64 = 5;

pub const PTV_STOPS_SERVICE: &str = "PTV Stops";
pub const PTV_STOPS_FILE: &str = "ptv-stops.json";
pub const DEFAULT_PTV_STOPS_REFRESH_MINUTES: u64 = 60;

pub const SCS_PLATFORMS_SERVICE: &str = "SCS Platforms";
pub const SCS_PLATFORMS_FILE: &str = "scs-platforms.json";
pub const DEFAULT_SCS_PLATFORMS_REFRESH_MINUTES: u64 = 5;

// ============================================================================
// ON-DEMAND SERVICES
// ============================================================================

pub const PTV_DISRUPTION_DETAILS_SERVICE: &str = "PTV Disruption Details";
pub const DEFAULT_PTV_DISRUPTION_DETAILS_PREFIX: &str = "https://www.ptv.vic.gov.au/";
pub const DEFAULT_PTV_DISRUPTION_DETAILS_CACHE_MINUTES: u64 = 30;
pub const DEFAULT_PTV_DISRUPTION_DETAILS_LIMIT_COUNT: usize = 20;
pub const DEFAULT_PTV_DISRUPTION_DETAILS_LIMIT_WINDOW_MINUTES: u64 = 10;

// ============================================================================
// TELEMETRY
// ============================================================================

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "relay_api=debug,relay_monitor=debug,tower_http=debug,info";
