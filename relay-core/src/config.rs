//! Configuration types for the monitoring engines.
//!
//! These are injected at construction; reading them from the environment is
//! the job of the binary.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Successful polls needed after a failure before a dataset reads healthy again.
pub const FLAKY_WINDOW: u32 = 5;

/// Lifecycles without a success after which a dataset is stale.
pub const STALE_AFTER_LIFECYCLES: f64 = 1.1;

/// Lifecycles without a success after which a dataset is dead.
pub const DEAD_AFTER_LIFECYCLES: f64 = 3.1;

/// Number of on-demand outcomes remembered for health reporting.
pub const DEFAULT_OUTCOME_CAPACITY: usize = 100;

/// Configuration for a scheduled polling engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Time between refreshes; also the unit of staleness.
    pub poll_interval: Duration,
}

impl PollingConfig {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval".to_string(),
                value: format!("{:?}", self.poll_interval),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration for an on-demand orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnDemandConfig {
    /// How long a definitive answer stays cached.
    pub cache_ttl: Duration,
    /// Real fetches allowed per `rate_limit_window`.
    pub rate_limit_max: usize,
    /// Trailing window the rate limiter counts over.
    pub rate_limit_window: Duration,
    /// Keys must start with this prefix to be looked up.
    pub key_prefix: String,
    /// Size of the rolling outcome buffer.
    pub outcome_capacity: usize,
}

impl OnDemandConfig {
    pub fn new(
        cache_ttl: Duration,
        rate_limit_max: usize,
        rate_limit_window: Duration,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            cache_ttl,
            rate_limit_max,
            rate_limit_window,
            key_prefix: key_prefix.into(),
            outcome_capacity: DEFAULT_OUTCOME_CAPACITY,
        }
    }

    /// Override the outcome buffer size.
    pub fn with_outcome_capacity(mut self, capacity: usize) -> Self {
        self.outcome_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl.is_zero() {
            return Err(invalid("cache_ttl", format!("{:?}", self.cache_ttl)));
        }
        if self.rate_limit_max == 0 {
            return Err(invalid("rate_limit_max", self.rate_limit_max.to_string()));
        }
        if self.rate_limit_window.is_zero() {
            return Err(invalid(
                "rate_limit_window",
                format!("{:?}", self.rate_limit_window),
            ));
        }
        if self.outcome_capacity == 0 {
            return Err(invalid("outcome_capacity", self.outcome_capacity.to_string()));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: String) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value,
        reason: "must be greater than zero".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_demand() -> OnDemandConfig {
        OnDemandConfig::new(
            Duration::from_secs(1800),
            20,
            Duration::from_secs(600),
            "https://www.ptv.vic.gov.au/",
        )
    }

    #[test]
    fn test_polling_config_rejects_zero_interval() {
        let err = PollingConfig::new(Duration::ZERO).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "poll_interval"));
        assert!(PollingConfig::new(Duration::from_secs(1)).validate().is_ok());
    }

    #[test]
    fn test_on_demand_defaults_to_hundred_outcomes() {
        let config = on_demand();
        assert_eq!(config.outcome_capacity, DEFAULT_OUTCOME_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_on_demand_rejects_zero_limits() {
        let mut config = on_demand();
        config.rate_limit_max = 0;
        assert!(config.validate().is_err());

        let config = on_demand().with_outcome_capacity(0);
        assert!(config.validate().is_err());

        let mut config = on_demand();
        config.rate_limit_window = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any positive interval is a valid polling configuration.
        #[test]
        fn prop_positive_interval_is_valid(millis in 1u64..10_000_000) {
            prop_assert!(PollingConfig::new(Duration::from_millis(millis)).validate().is_ok());
        }
    }
}
