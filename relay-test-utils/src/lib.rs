//! Transit Relay Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Scripted collaborators standing in for real data sources and fetchers
//! - Proptest generators for outcomes and fetch results
//! - Fixtures for common configurations
//! - Custom assertions for relay results

pub use relay_core::{
    Answer, Clock, ConfigError, DataSource, DetailsFetcher, FetchError, Fingerprint,
    ManualClock, OnDemandConfig, OnDemandHealth, Outcome, PollHealth, PollingConfig,
    RelayError, RelayResult, SharedClock, SourceError, Timestamp,
};

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

// ============================================================================
// SCRIPTED COLLABORATORS
// ============================================================================

#[derive(Debug, Default)]
struct ScriptedSourceInner {
    responses: Mutex<VecDeque<Result<Fingerprint, SourceError>>>,
    calls: AtomicUsize,
}

/// Data source that replays a queue of scripted download results.
///
/// Clones share the same queue, so a test can keep a handle after moving a
/// clone into an engine. Once the queue is drained every call fails.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    name: String,
    public_path: Option<String>,
    inner: Arc<ScriptedSourceInner>,
}

impl ScriptedSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public_path: None,
            inner: Arc::default(),
        }
    }

    /// Republish path reported through `DataSource::public_path`.
    pub fn with_public_path(mut self, path: impl Into<String>) -> Self {
        self.public_path = Some(path.into());
        self
    }

    /// Queue a successful download with the given fingerprint.
    pub fn then_ok(self, fingerprint: &str) -> Self {
        self.push_ok(fingerprint);
        self
    }

    /// Queue a failed download.
    pub fn then_err(self, reason: &str) -> Self {
        self.push_err(reason);
        self
    }

    pub fn push_ok(&self, fingerprint: &str) {
        self.queue().push_back(Ok(Fingerprint::new(fingerprint)));
    }

    pub fn push_err(&self, reason: &str) {
        self.queue().push_back(Err(SourceError::Http {
            url: format!("scripted://{}", self.name),
            reason: reason.to_string(),
        }));
    }

    /// Number of `download` calls so far.
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<Fingerprint, SourceError>>> {
        self.inner
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn download(&self) -> Result<Fingerprint, SourceError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        self.queue().pop_front().unwrap_or_else(|| {
            Err(SourceError::Http {
                url: format!("scripted://{}", self.name),
                reason: "no scripted response left".to_string(),
            })
        })
    }

    fn public_path(&self) -> Option<&str> {
        self.public_path.as_deref()
    }
}

#[derive(Debug, Default)]
struct ScriptedFetcherInner {
    answers: Mutex<HashMap<String, Result<Answer<String>, FetchError>>>,
    calls: Mutex<Vec<String>>,
}

/// Details fetcher answering from a fixed table, recording every call.
///
/// Keys with no entry answer `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFetcher {
    inner: Arc<ScriptedFetcherInner>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `key` with the given details.
    pub fn with_details(self, key: &str, details: &str) -> Self {
        self.set(key, Ok(Answer::Found(details.to_string())));
        self
    }

    /// Answer `key` with the given error.
    pub fn with_error(self, key: &str, error: FetchError) -> Self {
        self.set(key, Err(error));
        self
    }

    /// Replace the scripted result for `key`.
    pub fn set(&self, key: &str, result: Result<Answer<String>, FetchError>) {
        self.inner
            .answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), result);
    }

    /// Total number of fetches performed.
    pub fn calls(&self) -> usize {
        self.recorded().len()
    }

    /// Number of fetches performed for `key`.
    pub fn calls_for(&self, key: &str) -> usize {
        self.recorded().iter().filter(|k| k.as_str() == key).count()
    }

    fn recorded(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.inner.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DetailsFetcher for ScriptedFetcher {
    type Payload = String;

    async fn fetch_details(&self, key: &str) -> Result<Answer<String>, FetchError> {
        self.recorded().push(key.to_string());
        self.inner
            .answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .unwrap_or(Ok(Answer::NotFound))
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for relay types.

    use super::*;
    use proptest::prelude::*;

    /// Generate any request outcome.
    pub fn arb_outcome() -> impl Strategy<Value = Outcome> {
        prop_oneof![
            Just(Outcome::CacheHit),
            Just(Outcome::Success),
            Just(Outcome::NotFound),
            Just(Outcome::TransportError),
            Just(Outcome::ParseError),
            Just(Outcome::RateLimited),
            Just(Outcome::InvalidInput),
        ]
    }

    /// Generate an outcome produced by a real upstream call.
    pub fn arb_attempt_outcome() -> impl Strategy<Value = Outcome> {
        prop_oneof![
            Just(Outcome::Success),
            Just(Outcome::NotFound),
            Just(Outcome::TransportError),
            Just(Outcome::ParseError),
        ]
    }

    /// Generate a result a details fetcher might return.
    pub fn arb_fetch_result() -> impl Strategy<Value = Result<Answer<String>, FetchError>> {
        prop_oneof![
            "[a-z ]{1,32}".prop_map(|details| Ok(Answer::Found(details))),
            Just(Ok(Answer::NotFound)),
            "[a-z ]{1,16}".prop_map(|reason| Err(FetchError::Transport(reason))),
            "[a-z ]{1,16}".prop_map(|reason| Err(FetchError::Parse(reason))),
        ]
    }

    /// Generate a hex fingerprint.
    pub fn arb_fingerprint() -> impl Strategy<Value = Fingerprint> {
        "[0-9a-f]{64}".prop_map(Fingerprint::new)
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built configurations and keys.

    use super::*;
    use std::time::Duration;

    /// Key prefix accepted by [`on_demand_config`].
    pub const DETAILS_PREFIX: &str = "https://www.ptv.vic.gov.au/";

    /// A valid details key.
    pub fn details_key(slug: &str) -> String {
        format!("{}live-travel-updates/article/{}", DETAILS_PREFIX, slug)
    }

    /// Clock frozen at the Unix epoch, shared.
    pub fn epoch_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::at_epoch())
    }

    /// One-second poll interval.
    pub fn one_second_polling() -> PollingConfig {
        PollingConfig::new(Duration::from_secs(1))
    }

    /// 30 minute cache, 3 fetches per minute.
    pub fn on_demand_config() -> OnDemandConfig {
        OnDemandConfig::new(
            Duration::from_secs(30 * 60),
            3,
            Duration::from_secs(60),
            DETAILS_PREFIX,
        )
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for relay results.

    use super::*;

    /// Assert that a RelayResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &RelayResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a RelayResult failed on the initial fetch.
    #[track_caller]
    pub fn assert_initial_fetch_error<T: std::fmt::Debug>(result: &RelayResult<T>) {
        match result {
            Err(RelayError::Source(SourceError::InitialFetch { .. })) => {}
            other => panic!("Expected InitialFetch error, got: {:?}", other),
        }
    }

    /// Assert that a RelayResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &RelayResult<T>) {
        match result {
            Err(RelayError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }
}
