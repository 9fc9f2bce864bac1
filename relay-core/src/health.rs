//! Health classifications
//!
//! Scheduled datasets and on-demand lookups report health differently: a
//! polled dataset ages, while an on-demand service is judged by the outcomes
//! of its recent requests.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health of a scheduled, polled dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollHealth {
    /// Fresh data and no recent failures
    Healthy,
    /// Fresh data, but a failure happened within the last few polls
    Flaky,
    /// Last success is more than 1.1 poll intervals old
    Stale,
    /// Never succeeded, or last success is more than 3.1 poll intervals old
    Dead,
}

/// Health of an on-demand lookup service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OnDemandHealth {
    /// No requests observed yet
    Unused,
    /// Nothing in the recent window produced a usable answer
    Dead,
    /// Some recent upstream fetches failed
    SomeErrors,
    /// No errors, but the rate limiter is currently rejecting fetches
    RateLimited,
    Healthy,
}

/// Classification of a single on-demand request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    CacheHit,
    Success,
    NotFound,
    TransportError,
    ParseError,
    RateLimited,
    InvalidInput,
}

impl Outcome {
    /// Upstream fetch failures; these drive the error-rate math.
    pub fn is_error(self) -> bool {
        matches!(self, Outcome::TransportError | Outcome::ParseError)
    }

    /// Outcomes produced by an actual call to the upstream.
    pub fn is_attempt(self) -> bool {
        matches!(
            self,
            Outcome::Success | Outcome::NotFound | Outcome::TransportError | Outcome::ParseError
        )
    }

    /// Fresh definitive answers from the upstream. These are also the only
    /// results stored in the cache; a cache hit proves nothing about the
    /// upstream and does not count.
    pub fn is_answer(self) -> bool {
        matches!(self, Outcome::Success | Outcome::NotFound)
    }

    /// Whether the result of this outcome may be stored in the cache.
    pub fn is_cacheable(self) -> bool {
        self.is_answer()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::CacheHit => "cache-hit",
            Outcome::Success => "success",
            Outcome::NotFound => "not-found",
            Outcome::TransportError => "transport-error",
            Outcome::ParseError => "parse-error",
            Outcome::RateLimited => "rate-limited",
            Outcome::InvalidInput => "invalid-input",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
