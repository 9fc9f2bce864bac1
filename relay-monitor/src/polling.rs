//! Scheduled polling engine.
//!
//! A [`PollingEngine`] owns one [`DataSource`] and refreshes it on a fixed
//! interval. The source persists whatever it downloads and reports a
//! fingerprint; the engine only compares fingerprints and keeps the timing
//! record that health is derived from.
//!
//! # Lifecycle
//!
//! ```ignore
//! let engine = Arc::new(PollingEngine::new(source, config, clock)?);
//! engine.init().await?;              // fatal on failure
//! let handle = engine.clone().start(shutdown_rx);
//! ```

use std::sync::{Arc, Mutex};

use relay_core::{
    DataSource, Fingerprint, PollHealth, PollingConfig, RelayResult, SharedClock,
    SourceError, Timestamp, DEAD_AFTER_LIFECYCLES, FLAKY_WINDOW, STALE_AFTER_LIFECYCLES,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::lock;

// ============================================================================
// CYCLE RECORD
// ============================================================================

/// Timing and fingerprint state of a polled dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollCycleRecord {
    /// Fingerprint of the last successful download.
    pub fingerprint: Option<Fingerprint>,
    pub attempted_at: Option<Timestamp>,
    pub succeeded_at: Option<Timestamp>,
    /// Last time a refresh produced a different fingerprint.
    pub modified_at: Option<Timestamp>,
    /// Successes still needed before the dataset stops reading flaky.
    pub failure_streak: u32,
}

impl PollCycleRecord {
    /// Poll intervals elapsed since the last success.
    ///
    /// `None` when there has never been a success. A clock that reads
    /// earlier than `succeeded_at` yields zero.
    pub fn elapsed_lifecycles(
        &self,
        now: Timestamp,
        poll_interval: std::time::Duration,
    ) -> Option<f64> {
        let succeeded_at = self.succeeded_at?;
        let elapsed_ms = (now - succeeded_at).num_milliseconds().max(0) as f64;
        let interval_ms = poll_interval.as_nanos() as f64 / 1_000_000.0;
        Some(elapsed_ms / interval_ms)
    }

    /// Classify the record at `now`.
    pub fn health(&self, now: Timestamp, poll_interval: std::time::Duration) -> PollHealth {
        match self.elapsed_lifecycles(now, poll_interval) {
            None => PollHealth::Dead,
            Some(elapsed) if elapsed > DEAD_AFTER_LIFECYCLES => PollHealth::Dead,
            Some(elapsed) if elapsed > STALE_AFTER_LIFECYCLES => PollHealth::Stale,
            Some(_) if self.failure_streak > 0 => PollHealth::Flaky,
            Some(_) => PollHealth::Healthy,
        }
    }
}

/// Result of one refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Download succeeded and the fingerprint changed.
    Modified,
    /// Download succeeded with the same fingerprint.
    Unchanged,
    /// Download failed; the previous data is still served.
    Failed,
}

/// Serializable snapshot for the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollStatus {
    pub name: String,
    pub status: PollHealth,
    pub fingerprint: Option<Fingerprint>,
    pub attempted_at: Option<Timestamp>,
    pub succeeded_at: Option<Timestamp>,
    pub modified_at: Option<Timestamp>,
    pub failure_streak: u32,
    /// Path the dataset is republished at, if any.
    pub url: Option<String>,
}

// ============================================================================
// ENGINE
// ============================================================================

/// Scheduled fetch loop with fingerprint change detection and derived health.
pub struct PollingEngine<S> {
    source: S,
    config: PollingConfig,
    clock: SharedClock,
    record: Mutex<PollCycleRecord>,
}

impl<S: DataSource> PollingEngine<S> {
    /// Create an engine. Fails if the configuration is invalid.
    pub fn new(source: S, config: PollingConfig, clock: SharedClock) -> RelayResult<Self> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            clock,
            record: Mutex::new(PollCycleRecord::default()),
        })
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Perform the first fetch.
    ///
    /// Unlike later refreshes a failure here is returned, so startup can
    /// abort rather than serve a service with no data at all.
    pub async fn init(&self) -> RelayResult<()> {
        let attempted_at = self.clock.now();
        lock(&self.record).attempted_at = Some(attempted_at);

        let fingerprint = self.source.download().await.map_err(|e| {
            tracing::error!(service = %self.name(), error = %e, "Initial fetch failed");
            SourceError::InitialFetch {
                service: self.name().to_string(),
                reason: e.to_string(),
            }
        })?;

        let now = self.clock.now();
        {
            let mut record = lock(&self.record);
            record.succeeded_at = Some(now);
            record.fingerprint = Some(fingerprint.clone());
        }

        tracing::info!(
            service = %self.name(),
            fingerprint = %fingerprint,
            "Initial fetch complete"
        );
        Ok(())
    }

    /// Run one refresh cycle. Failures are logged and swallowed.
    pub async fn refresh(&self) -> RefreshOutcome {
        lock(&self.record).attempted_at = Some(self.clock.now());

        match self.source.download().await {
            Ok(fingerprint) => {
                let now = self.clock.now();
                let modified = {
                    let mut record = lock(&self.record);
                    record.succeeded_at = Some(now);
                    record.failure_streak = record.failure_streak.saturating_sub(1);
                    let modified = record.fingerprint.as_ref() != Some(&fingerprint);
                    if modified {
                        record.modified_at = Some(now);
                        record.fingerprint = Some(fingerprint.clone());
                    }
                    modified
                };

                if modified {
                    tracing::info!(
                        service = %self.name(),
                        fingerprint = %fingerprint,
                        "Dataset modified"
                    );
                    RefreshOutcome::Modified
                } else {
                    tracing::debug!(service = %self.name(), "Dataset unchanged");
                    RefreshOutcome::Unchanged
                }
            }
            Err(e) => {
                lock(&self.record).failure_streak = FLAKY_WINDOW;
                tracing::warn!(
                    service = %self.name(),
                    error = %e,
                    "Refresh failed, keeping previous data"
                );
                RefreshOutcome::Failed
            }
        }
    }

    /// Copy of the current cycle record.
    pub fn record(&self) -> PollCycleRecord {
        lock(&self.record).clone()
    }

    pub fn health(&self) -> PollHealth {
        let now = self.clock.now();
        lock(&self.record).health(now, self.config.poll_interval)
    }

    pub fn status(&self) -> PollStatus {
        let now = self.clock.now();
        let record = self.record();
        PollStatus {
            name: self.name().to_string(),
            status: record.health(now, self.config.poll_interval),
            fingerprint: record.fingerprint,
            attempted_at: record.attempted_at,
            succeeded_at: record.succeeded_at,
            modified_at: record.modified_at,
            failure_streak: record.failure_streak,
            url: self.source.public_path().map(str::to_string),
        }
    }
}

impl<S: DataSource + 'static> PollingEngine<S> {
    /// Spawn the refresh loop.
    ///
    /// The interval's immediate first tick is consumed since [`init`](Self::init)
    /// already fetched. The task exits once `shutdown` reads `true` or its
    /// sender is dropped.
    pub fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            tracing::info!(
                service = %self.name(),
                poll_interval_ms = self.config.poll_interval.as_millis() as u64,
                "Polling started"
            );

            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        self.refresh().await;
                    }
                }
            }

            tracing::info!(service = %self.name(), "Polling stopped");
        })
    }
}

impl<S: DataSource> std::fmt::Debug for PollingEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingEngine")
            .field("name", &self.name())
            .field("config", &self.config)
            .field("record", &*lock(&self.record))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::ManualClock;
    use relay_test_utils::assertions::{assert_config_error, assert_initial_fetch_error};
    use relay_test_utils::fixtures::{epoch_clock, one_second_polling};
    use relay_test_utils::ScriptedSource;
    use std::time::Duration;

    fn engine(source: ScriptedSource) -> (Arc<ManualClock>, PollingEngine<ScriptedSource>) {
        let clock = epoch_clock();
        let engine = PollingEngine::new(source, one_second_polling(), clock.clone())
            .expect("valid config");
        (clock, engine)
    }

    #[test]
    fn test_new_rejects_zero_interval() {
        let result = PollingEngine::new(
            ScriptedSource::new("feed"),
            PollingConfig::new(Duration::ZERO),
            epoch_clock(),
        );
        assert_config_error(&result);
    }

    #[tokio::test]
    async fn test_init_sets_record_without_modified_at() {
        let (clock, engine) = engine(ScriptedSource::new("feed").then_ok("aa"));
        clock.set_millis(500);

        engine.init().await.expect("init should succeed");

        let record = engine.record();
        assert_eq!(record.fingerprint, Some(Fingerprint::new("aa")));
        assert_eq!(record.succeeded_at.map(|t| t.timestamp_millis()), Some(500));
        assert_eq!(record.attempted_at, record.succeeded_at);
        assert_eq!(record.modified_at, None);
        assert_eq!(engine.health(), PollHealth::Healthy);
    }

    #[tokio::test]
    async fn test_init_failure_is_initial_fetch_error() {
        let (_clock, engine) = engine(ScriptedSource::new("feed").then_err("503"));
        let result = engine.init().await;
        assert_initial_fetch_error(&result);
        assert!(engine.record().attempted_at.is_some());
        assert_eq!(engine.health(), PollHealth::Dead);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_fingerprint() {
        let (clock, engine) = engine(ScriptedSource::new("feed").then_ok("aa").then_err("boom"));
        engine.init().await.expect("init");
        let before = engine.record();

        clock.set_millis(1000);
        assert_eq!(engine.refresh().await, RefreshOutcome::Failed);

        let after = engine.record();
        assert_eq!(after.fingerprint, before.fingerprint);
        assert_eq!(after.succeeded_at, before.succeeded_at);
        assert_eq!(after.modified_at, before.modified_at);
        assert_eq!(after.failure_streak, FLAKY_WINDOW);
        assert_eq!(after.attempted_at.map(|t| t.timestamp_millis()), Some(1000));
    }

    #[tokio::test]
    async fn test_refresh_detects_modification() {
        let (clock, engine) = engine(
            ScriptedSource::new("feed")
                .then_ok("aa")
                .then_ok("aa")
                .then_ok("bb"),
        );
        engine.init().await.expect("init");

        clock.set_millis(1000);
        assert_eq!(engine.refresh().await, RefreshOutcome::Unchanged);
        assert_eq!(engine.record().modified_at, None);

        clock.set_millis(2000);
        assert_eq!(engine.refresh().await, RefreshOutcome::Modified);
        let record = engine.record();
        assert_eq!(record.fingerprint, Some(Fingerprint::new("bb")));
        assert_eq!(record.modified_at.map(|t| t.timestamp_millis()), Some(2000));
    }

    #[tokio::test]
    async fn test_refresh_without_prior_fingerprint_is_modified() {
        let (_clock, engine) = engine(ScriptedSource::new("feed").then_ok("aa"));
        assert_eq!(engine.refresh().await, RefreshOutcome::Modified);
    }

    #[tokio::test]
    async fn test_flaky_decays_one_per_success() {
        let source = ScriptedSource::new("feed").then_ok("aa").then_err("boom");
        let handle = source.clone();
        let (clock, engine) = engine(source);
        engine.init().await.expect("init");

        engine.refresh().await;
        assert_eq!(engine.health(), PollHealth::Flaky);

        for remaining in (0..FLAKY_WINDOW).rev() {
            handle.push_ok("aa");
            clock.advance(Duration::from_millis(500));
            engine.refresh().await;
            assert_eq!(engine.record().failure_streak, remaining);
        }
        assert_eq!(engine.health(), PollHealth::Healthy);
    }

    #[tokio::test]
    async fn test_failure_resets_streak_to_window() {
        let source = ScriptedSource::new("feed")
            .then_ok("aa")
            .then_err("one")
            .then_ok("aa")
            .then_ok("aa")
            .then_err("two");
        let (_clock, engine) = engine(source);
        engine.init().await.expect("init");

        engine.refresh().await;
        engine.refresh().await;
        engine.refresh().await;
        assert_eq!(engine.record().failure_streak, FLAKY_WINDOW - 2);

        engine.refresh().await;
        assert_eq!(engine.record().failure_streak, FLAKY_WINDOW);
    }

    #[tokio::test]
    async fn test_health_thresholds_by_lifecycles() {
        let (clock, engine) = engine(ScriptedSource::new("feed").then_ok("aa"));
        engine.init().await.expect("init");

        clock.set_millis(1100);
        assert_eq!(engine.health(), PollHealth::Healthy);

        clock.set_millis(1150);
        assert_eq!(engine.health(), PollHealth::Stale);

        clock.set_millis(3100);
        assert_eq!(engine.health(), PollHealth::Stale);

        clock.set_millis(3200);
        assert_eq!(engine.health(), PollHealth::Dead);
    }

    #[tokio::test]
    async fn test_stale_outranks_flaky() {
        let (clock, engine) = engine(ScriptedSource::new("feed").then_ok("aa").then_err("x"));
        engine.init().await.expect("init");
        engine.refresh().await;

        clock.set_millis(2000);
        assert_eq!(engine.health(), PollHealth::Stale);
    }

    #[test]
    fn test_clock_behind_success_clamps_to_zero() {
        let record = PollCycleRecord {
            succeeded_at: Some(Timestamp::UNIX_EPOCH + chrono::Duration::seconds(10)),
            ..Default::default()
        };
        let elapsed = record.elapsed_lifecycles(Timestamp::UNIX_EPOCH, Duration::from_secs(1));
        assert_eq!(elapsed, Some(0.0));
        assert_eq!(
            record.health(Timestamp::UNIX_EPOCH, Duration::from_secs(1)),
            PollHealth::Healthy
        );
    }

    #[tokio::test]
    async fn test_status_snapshot_serializes_camel_case() {
        let source = ScriptedSource::new("PTV Disruptions")
            .with_public_path("/ptv-disruptions.json")
            .then_ok("aa");
        let (_clock, engine) = engine(source);
        engine.init().await.expect("init");

        let status = engine.status();
        assert_eq!(status.name, "PTV Disruptions");
        assert_eq!(status.url.as_deref(), Some("/ptv-disruptions.json"));

        let json = serde_json::to_value(&status).expect("serialize");
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["fingerprint"], "aa");
        assert_eq!(json["failureStreak"], 0);
        assert!(json["modifiedAt"].is_null());
        assert!(json.get("succeededAt").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_polls_each_interval_until_shutdown() {
        let source = ScriptedSource::new("feed")
            .then_ok("aa")
            .then_ok("aa")
            .then_ok("bb");
        let handle = source.clone();
        let (_clock, engine) = engine(source);
        let engine = Arc::new(engine);
        engine.init().await.expect("init");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = engine.clone().start(shutdown_rx);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(handle.calls(), 3);
        assert_eq!(engine.record().fingerprint, Some(Fingerprint::new("bb")));

        shutdown_tx.send(true).expect("receiver alive");
        task.await.expect("polling task");

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.calls(), 3);
    }
}
