//! On-demand fetch orchestrator.
//!
//! Every request runs the same pipeline:
//!
//! ```text
//! NEW ─┬─ invalid key ─────────────► InvalidInput   (not recorded)
//!      ├─ cached ──────────────────► CacheHit       (recorded)
//!      ├─ limiter activated ───────► RateLimited    (recorded)
//!      └─ log occurrence, fetch ─┬─► Success / NotFound        (cached + recorded)
//!                                └─► TransportError / ParseError (recorded)
//! ```
//!
//! The cache, limiter, and outcome log each sit behind their own mutex. None
//! of them is locked while the upstream fetch is awaited, so concurrent
//! lookups of the same uncached key may each reach the upstream.

use std::sync::Mutex;

use relay_core::{
    Answer, DetailsFetcher, FetchError, OnDemandConfig, OnDemandHealth, Outcome,
    RelayResult, SharedClock, Timestamp,
};
use relay_storage::{SlidingWindowRateLimiter, TtlCache};
use serde::{Deserialize, Serialize};

use crate::lock;
use crate::outcomes::OutcomeLog;

/// Classified result of one lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup<P> {
    pub outcome: Outcome,
    /// Definitive answer, present for `Success`, `NotFound`, and `CacheHit`.
    pub answer: Option<Answer<P>>,
}

impl<P> Lookup<P> {
    fn empty(outcome: Outcome) -> Self {
        Self {
            outcome,
            answer: None,
        }
    }

    /// Found payload, if any.
    pub fn into_details(self) -> Option<P> {
        self.answer.and_then(Answer::into_found)
    }
}

/// Serializable snapshot for the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnDemandStatus {
    pub status: OnDemandHealth,
    pub last_fetch_at: Option<Timestamp>,
    pub last_error_at: Option<Timestamp>,
    /// `"<Activated|OK> (<count> of <max>)"`
    pub rate_limiter: String,
    /// `"<errors> of last <attempts> attempts"`
    pub error_rate: String,
    pub cached_entries: usize,
}

/// Cache- and rate-limit-fronted lookups against a [`DetailsFetcher`].
pub struct OnDemandOrchestrator<F: DetailsFetcher> {
    name: String,
    fetcher: F,
    config: OnDemandConfig,
    clock: SharedClock,
    cache: Mutex<TtlCache<String, Answer<F::Payload>>>,
    limiter: Mutex<SlidingWindowRateLimiter>,
    outcomes: Mutex<OutcomeLog>,
    last_fetch_at: Mutex<Option<Timestamp>>,
}

impl<F: DetailsFetcher> OnDemandOrchestrator<F> {
    /// Create an orchestrator. Fails if the configuration is invalid.
    pub fn new(
        name: impl Into<String>,
        fetcher: F,
        config: OnDemandConfig,
        clock: SharedClock,
    ) -> RelayResult<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            cache: Mutex::new(TtlCache::new(config.cache_ttl, clock.clone())),
            limiter: Mutex::new(SlidingWindowRateLimiter::new(
                config.rate_limit_max,
                config.rate_limit_window,
                clock.clone(),
            )),
            outcomes: Mutex::new(OutcomeLog::new(config.outcome_capacity)),
            last_fetch_at: Mutex::new(None),
            fetcher,
            config,
            clock,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Non-empty, free of whitespace, and under the configured prefix.
    pub fn is_valid_key(&self, key: &str) -> bool {
        !key.is_empty()
            && !key.chars().any(char::is_whitespace)
            && key.starts_with(&self.config.key_prefix)
    }

    /// Answer a lookup for `key`.
    pub async fn on_request(&self, key: &str) -> Lookup<F::Payload> {
        if !self.is_valid_key(key) {
            tracing::debug!(service = %self.name, key, "Rejected invalid key");
            return Lookup::empty(Outcome::InvalidInput);
        }

        let cached = lock(&self.cache).get(key);
        if let Some(answer) = cached {
            self.record(Outcome::CacheHit);
            return Lookup {
                outcome: Outcome::CacheHit,
                answer: Some(answer),
            };
        }

        {
            let mut limiter = lock(&self.limiter);
            if limiter.activated() {
                drop(limiter);
                tracing::debug!(service = %self.name, key, "Rate limited");
                self.record(Outcome::RateLimited);
                return Lookup::empty(Outcome::RateLimited);
            }
            limiter.log_occurrence();
        }
        *lock(&self.last_fetch_at) = Some(self.clock.now());

        let (outcome, answer) = match self.fetcher.fetch_details(key).await {
            Ok(answer) => {
                let outcome = match answer {
                    Answer::Found(_) => Outcome::Success,
                    Answer::NotFound => Outcome::NotFound,
                };
                if outcome.is_cacheable() {
                    lock(&self.cache).save(key.to_string(), answer.clone());
                }
                (outcome, Some(answer))
            }
            Err(e) => {
                let outcome = match e {
                    FetchError::Transport(_) => Outcome::TransportError,
                    FetchError::Parse(_) => Outcome::ParseError,
                };
                tracing::warn!(
                    service = %self.name,
                    key,
                    outcome = %outcome,
                    error = %e,
                    "Failed to fetch details"
                );
                (outcome, None)
            }
        };

        self.record(outcome);
        Lookup { outcome, answer }
    }

    fn record(&self, outcome: Outcome) {
        let now = self.clock.now();
        lock(&self.outcomes).push(now, outcome);
    }

    pub fn health(&self) -> OnDemandHealth {
        let outcomes = lock(&self.outcomes).clone();
        outcomes.health(|| lock(&self.limiter).activated())
    }

    pub fn status(&self) -> OnDemandStatus {
        let outcomes = lock(&self.outcomes).clone();
        let (activated, count, max) = {
            let mut limiter = lock(&self.limiter);
            (
                limiter.activated(),
                limiter.counter_value(),
                limiter.max_occurrences(),
            )
        };
        let status = outcomes.health(|| activated);
        let cached_entries = {
            let mut cache = lock(&self.cache);
            cache.sweep();
            cache.len()
        };

        OnDemandStatus {
            status,
            last_fetch_at: *lock(&self.last_fetch_at),
            last_error_at: outcomes.last_error_at(),
            rate_limiter: format!(
                "{} ({} of {})",
                if activated { "Activated" } else { "OK" },
                count,
                max
            ),
            error_rate: format!(
                "{} of last {} attempts",
                outcomes.errors(),
                outcomes.attempts()
            ),
            cached_entries,
        }
    }
}

impl<F: DetailsFetcher> std::fmt::Debug for OnDemandOrchestrator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnDemandOrchestrator")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
