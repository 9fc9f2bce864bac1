//! Server Configuration Module
//!
//! Every setting is read from the environment once at startup. Scheduled
//! feeds fetched from a URL are only enabled when their URL is set; the GTFS
//! download script runs unless `GTFS_DOWNLOAD_SCRIPT` is set to an empty
//! string.

use std::collections::HashMap;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use relay_core::{ConfigError, OnDemandConfig, PollingConfig};

use crate::constants::*;

// ============================================================================
// SERVICE CONFIGURATION
// ============================================================================

/// A dataset produced by running a local download script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptFeedConfig {
    pub name: String,
    pub script: PathBuf,
    pub polling: PollingConfig,
}

/// A JSON dataset fetched from a URL and persisted into the data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    /// Extra request header, e.g. an API key.
    pub header: Option<(String, String)>,
    /// File name inside the data directory.
    pub file_name: String,
    pub polling: PollingConfig,
}

/// The on-demand details lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailsConfig {
    pub name: String,
    pub on_demand: OnDemandConfig,
}

// ============================================================================
// RELAY CONFIGURATION
// ============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub bind: String,
    pub port: u16,
    /// Shared secret required in the `relay-key` header, if set.
    pub relay_key: Option<String>,
    pub data_dir: PathBuf,
    pub public_url: String,
    pub fetch_timeout: Duration,
    pub gtfs: Option<ScriptFeedConfig>,
    pub feeds: Vec<FeedConfig>,
    pub details: DetailsConfig,
}

impl RelayConfig {
    /// Create RelayConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `PORT` (default: 3000), `RELAY_BIND` (default: 0.0.0.0)
    /// - `RELAY_KEY`: required `relay-key` header value (default: none)
    /// - `RELAY_DATA_DIR` (default: data), `RELAY_PUBLIC_URL` (default: http://localhost:3000)
    /// - `RELAY_FETCH_TIMEOUT_SECS` (default: 30)
    /// - `GTFS_DOWNLOAD_SCRIPT`, `GTFS_REFRESH_HOURS` (default: 6)
    /// - `GTFS_REALTIME_URL`, `GTFS_REALTIME_KEY`, `GTFS_REALTIME_REFRESH_SECONDS` (default: 30)
    /// - `PTV_DISRUPTIONS_URL`, `PTV_DISRUPTIONS_REFRESH_MINUTES` (default: 5)
    /// - `PTV_STOPS_URL`, `PTV_STOPS_REFRESH_MINUTES` (default: 60)
    /// - `SCS_PLATFORMS_URL`, `SCS_PLATFORMS_REFRESH_MINUTES` (default: 5)
    /// - `PTV_DISRUPTION_DETAILS_PREFIX`, `PTV_DISRUPTION_DETAILS_CACHE_MINUTES` (default: 30),
    ///   `PTV_DISRUPTION_DETAILS_LIMIT_COUNT` (default: 20),
    ///   `PTV_DISRUPTION_DETAILS_LIMIT_WINDOW_MINUTES` (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an explicit set of variables.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let gtfs = match env.raw("GTFS_DOWNLOAD_SCRIPT") {
            Some(script) if script.trim().is_empty() => None,
            script => Some(ScriptFeedConfig {
                name: GTFS_SERVICE.to_string(),
                script: PathBuf::from(
                    script.unwrap_or_else(|| DEFAULT_GTFS_DOWNLOAD_SCRIPT.to_string()),
                ),
                polling: PollingConfig::new(hours(
                    env.parsed("GTFS_REFRESH_HOURS", DEFAULT_GTFS_REFRESH_HOURS)?,
                )),
            }),
        };

        let mut feeds = Vec::new();
        if let Some(url) = env.optional("GTFS_REALTIME_URL") {
            let key = env
                .optional("GTFS_REALTIME_KEY")
                .ok_or_else(|| ConfigError::MissingRequired {
                    field: "GTFS_REALTIME_KEY".to_string(),
                })?;
            feeds.push(FeedConfig {
                name: GTFS_REALTIME_SERVICE.to_string(),
                url,
                header: Some((GTFS_REALTIME_KEY_HEADER.to_string(), key)),
                file_name: GTFS_REALTIME_FILE.to_string(),
                polling: PollingConfig::new(Duration::from_secs(env.parsed(
                    "GTFS_REALTIME_REFRESH_SECONDS",
                    DEFAULT_GTFS_REALTIME_REFRESH_SECONDS,
                )?)),
            });
        }
        for (service, url_var, minutes_var, default_minutes, file_name) in [
            (
                PTV_DISRUPTIONS_SERVICE,
                "PTV_DISRUPTIONS_URL",
                "PTV_DISRUPTIONS_REFRESH_MINUTES",
                DEFAULT_PTV_DISRUPTIONS_REFRESH_MINUTES,
                PTV_DISRUPTIONS_FILE,
            ),
            (
                PTV_STOPS_SERVICE,
                "PTV_STOPS_URL",
                "PTV_STOPS_REFRESH_MINUTES",
                DEFAULT_PTV_STOPS_REFRESH_MINUTES,
                PTV_STOPS_FILE,
            ),
            (
                SCS_PLATFORMS_SERVICE,
                "SCS_PLATFORMS_URL",
                "SCS_PLATFORMS_REFRESH_MINUTES",
                DEFAULT_SCS_PLATFORMS_REFRESH_MINUTES,
                SCS_PLATFORMS_FILE,
            ),
        ] {
            if let Some(url) = env.optional(url_var) {
                feeds.push(FeedConfig {
                    name: service.to_string(),
                    url,
                    header: None,
                    file_name: file_name.to_string(),
                    polling: PollingConfig::new(minutes(env.parsed(minutes_var, default_minutes)?)),
                });
            }
        }

        let details = DetailsConfig {
            name: PTV_DISRUPTION_DETAILS_SERVICE.to_string(),
            on_demand: OnDemandConfig::new(
                minutes(env.parsed(
                    "PTV_DISRUPTION_DETAILS_CACHE_MINUTES",
                    DEFAULT_PTV_DISRUPTION_DETAILS_CACHE_MINUTES,
                )?),
                env.parsed(
                    "PTV_DISRUPTION_DETAILS_LIMIT_COUNT",
                    DEFAULT_PTV_DISRUPTION_DETAILS_LIMIT_COUNT,
                )?,
                minutes(env.parsed(
                    "PTV_DISRUPTION_DETAILS_LIMIT_WINDOW_MINUTES",
                    DEFAULT_PTV_DISRUPTION_DETAILS_LIMIT_WINDOW_MINUTES,
                )?),
                env.optional("PTV_DISRUPTION_DETAILS_PREFIX")
                    .unwrap_or_else(|| DEFAULT_PTV_DISRUPTION_DETAILS_PREFIX.to_string()),
            ),
        };

        let config = Self {
            bind: env
                .optional("RELAY_BIND")
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: env.parsed("PORT", DEFAULT_PORT)?,
            relay_key: env.optional("RELAY_KEY"),
            data_dir: PathBuf::from(
                env.optional("RELAY_DATA_DIR")
                    .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            public_url: env
                .optional("RELAY_PUBLIC_URL")
                .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string()),
            fetch_timeout: Duration::from_secs(
                env.parsed("RELAY_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?,
            ),
            gtfs,
            feeds,
            details,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every engine configuration and the bind address.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "RELAY_FETCH_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some(gtfs) = &self.gtfs {
            gtfs.polling.validate()?;
        }
        for feed in &self.feeds {
            feed.polling.validate()?;
        }
        self.details.on_demand.validate()
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind, self.port);
        addr.parse().map_err(|e| ConfigError::InvalidValue {
            field: "RELAY_BIND".to_string(),
            value: addr.clone(),
            reason: format!("{}", e),
        })
    }
}

/// Join a base URL and a path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ============================================================================
// HELPERS
// ============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn raw(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    /// Set and non-blank.
    fn optional(&self, key: &str) -> Option<String> {
        self.raw(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                field: key.to_string(),
                value: value.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

fn minutes(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(60))
}

fn hours(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(60 * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::from_map(&HashMap::new()).expect("defaults are valid");

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.relay_key, None);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert!(config.feeds.is_empty());

        let gtfs = config.gtfs.expect("gtfs enabled by default");
        assert_eq!(gtfs.script, PathBuf::from(DEFAULT_GTFS_DOWNLOAD_SCRIPT));
        assert_eq!(gtfs.polling.poll_interval, Duration::from_secs(6 * 3600));

        let on_demand = config.details.on_demand;
        assert_eq!(on_demand.cache_ttl, Duration::from_secs(30 * 60));
        assert_eq!(on_demand.rate_limit_max, 20);
        assert_eq!(on_demand.rate_limit_window, Duration::from_secs(10 * 60));
        assert_eq!(on_demand.key_prefix, DEFAULT_PTV_DISRUPTION_DETAILS_PREFIX);
    }

    #[test]
    fn test_empty_script_disables_gtfs() {
        let config = RelayConfig::from_map(&vars(&[("GTFS_DOWNLOAD_SCRIPT", "")])).expect("valid");
        assert!(config.gtfs.is_none());
    }

    #[test]
    fn test_url_feeds_enabled_when_set() {
        let config = RelayConfig::from_map(&vars(&[
            ("PTV_STOPS_URL", "https://example.test/stops"),
            ("PTV_STOPS_REFRESH_MINUTES", "15"),
            ("GTFS_REALTIME_URL", "https://example.test/realtime"),
            ("GTFS_REALTIME_KEY", "secret"),
        ]))
        .expect("valid");

        assert_eq!(config.feeds.len(), 2);
        let realtime = &config.feeds[0];
        assert_eq!(realtime.name, GTFS_REALTIME_SERVICE);
        assert_eq!(
            realtime.header,
            Some(("KeyId".to_string(), "secret".to_string()))
        );
        assert_eq!(realtime.polling.poll_interval, Duration::from_secs(30));

        let stops = &config.feeds[1];
        assert_eq!(stops.name, PTV_STOPS_SERVICE);
        assert_eq!(stops.file_name, PTV_STOPS_FILE);
        assert_eq!(stops.polling.poll_interval, Duration::from_secs(15 * 60));
    }

    #[test]
    fn test_realtime_requires_key() {
        let err = RelayConfig::from_map(&vars(&[("GTFS_REALTIME_URL", "https://example.test")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingRequired {
                field: "GTFS_REALTIME_KEY".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = RelayConfig::from_map(&vars(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "PORT"));
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let err = RelayConfig::from_map(&vars(&[("PTV_DISRUPTION_DETAILS_LIMIT_COUNT", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "rate_limit_max"));
    }

    #[test]
    fn test_join_url_under_configured_public_url() {
        let config = RelayConfig::from_map(&vars(&[(
            "RELAY_PUBLIC_URL",
            "https://relay.example.test/",
        )]))
        .expect("valid");
        assert_eq!(
            join_url(&config.public_url, "/ptv-stops.json"),
            "https://relay.example.test/ptv-stops.json"
        );
    }

    #[test]
    fn test_bind_addr() {
        let config = RelayConfig::from_map(&vars(&[("RELAY_BIND", "127.0.0.1"), ("PORT", "8080")]))
            .expect("valid");
        assert_eq!(
            config.bind_addr().map(|a| a.to_string()),
            Ok("127.0.0.1:8080".to_string())
        );

        let err = RelayConfig::from_map(&vars(&[("RELAY_BIND", "not a host")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "RELAY_BIND"));
    }
}
