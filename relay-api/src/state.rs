//! Application state shared by the router and the background jobs.

use std::path::PathBuf;
use std::sync::Arc;

use relay_core::{DataSource, DetailsFetcher, SharedClock};
use relay_monitor::{OnDemandOrchestrator, PollingEngine};
use serde_json::{Map, Value};

use crate::config::{join_url, RelayConfig};
use crate::error::{ApiError, ApiResult};
use crate::sources::{http_client, HttpDetailsFetcher, HttpJsonSource, ScriptSource};

/// Any scheduled data source.
pub type DynSource = Box<dyn DataSource>;

/// Any details fetcher returning text.
pub type DynFetcher = Box<dyn DetailsFetcher<Payload = String>>;

/// A scheduled dataset and its engine.
pub type PolledService = PollingEngine<DynSource>;

/// The on-demand details service.
pub type DetailsService = OnDemandOrchestrator<DynFetcher>;

#[derive(Clone)]
pub struct AppState {
    pub polled: Arc<Vec<Arc<PolledService>>>,
    pub details: Arc<DetailsService>,
    pub relay_key: Option<Arc<str>>,
    pub public_url: Arc<str>,
    pub data_dir: PathBuf,
}

impl AppState {
    pub fn new(
        polled: Vec<Arc<PolledService>>,
        details: DetailsService,
        relay_key: Option<String>,
        public_url: impl Into<String>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            polled: Arc::new(polled),
            details: Arc::new(details),
            relay_key: relay_key.map(Arc::from),
            public_url: Arc::from(public_url.into()),
            data_dir: data_dir.into(),
        }
    }

    /// Build every enabled service from configuration.
    pub fn from_config(config: &RelayConfig, clock: SharedClock) -> ApiResult<Self> {
        let client = http_client(config.fetch_timeout)
            .map_err(|e| ApiError::internal_error(format!("Failed to build HTTP client: {}", e)))?;

        let mut polled = Vec::new();
        if let Some(gtfs) = &config.gtfs {
            let source: DynSource = Box::new(ScriptSource::new(gtfs));
            polled.push(Arc::new(PollingEngine::new(
                source,
                gtfs.polling.clone(),
                clock.clone(),
            )?));
        }
        for feed in &config.feeds {
            let source: DynSource =
                Box::new(HttpJsonSource::new(feed, &config.data_dir, client.clone()));
            polled.push(Arc::new(PollingEngine::new(
                source,
                feed.polling.clone(),
                clock.clone(),
            )?));
        }

        let fetcher: DynFetcher = Box::new(HttpDetailsFetcher::new(client));
        let details = OnDemandOrchestrator::new(
            config.details.name.clone(),
            fetcher,
            config.details.on_demand.clone(),
            clock,
        )?;

        tracing::info!(
            polled = polled.len(),
            relay_key = config.relay_key.is_some(),
            data_dir = %config.data_dir.display(),
            "Services configured"
        );

        Ok(Self::new(
            polled,
            details,
            config.relay_key.clone(),
            config.public_url.clone(),
            config.data_dir.clone(),
        ))
    }

    /// Status of every service keyed by service name.
    ///
    /// Republish paths are expanded to absolute URLs under the public URL.
    pub fn status_report(&self) -> ApiResult<Map<String, Value>> {
        let mut report = Map::new();
        for service in self.polled.iter() {
            let mut status = service.status();
            status.url = status.url.map(|path| join_url(&self.public_url, &path));
            report.insert(status.name.clone(), serde_json::to_value(status)?);
        }
        report.insert(
            self.details.name().to_string(),
            serde_json::to_value(self.details.status())?,
        );
        Ok(report)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("polled", &self.polled.len())
            .field("details", &self.details.name())
            .field("relay_key", &self.relay_key.as_ref().map(|_| "<redacted>"))
            .field("public_url", &self.public_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::SystemClock;
    use std::collections::HashMap;

    #[test]
    fn test_from_config_builds_enabled_services() {
        let vars: HashMap<String, String> = [
            ("PTV_DISRUPTIONS_URL", "https://example.test/disruptions"),
            ("SCS_PLATFORMS_URL", "https://example.test/scs"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let config = RelayConfig::from_map(&vars).expect("valid");

        let state = AppState::from_config(&config, SystemClock::shared()).expect("state");
        let names: Vec<&str> = state.polled.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["GTFS", "PTV Disruptions", "SCS Platforms"]);
        assert_eq!(state.details.name(), "PTV Disruption Details");
    }

    #[test]
    fn test_debug_redacts_relay_key() {
        let vars: HashMap<String, String> = [("RELAY_KEY", "hunter2"), ("GTFS_DOWNLOAD_SCRIPT", "")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = RelayConfig::from_map(&vars).expect("valid");
        let state = AppState::from_config(&config, SystemClock::shared()).expect("state");

        let debug = format!("{:?}", state);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
