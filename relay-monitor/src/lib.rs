//! Transit Relay Monitor - Freshness & Health Engines
//!
//! Two engines sit between the HTTP layer and the upstream data providers:
//!
//! - [`PollingEngine`]: refreshes a dataset on a fixed interval, keeps the
//!   last good copy across failures, and derives healthy / flaky / stale /
//!   dead from how long ago it last succeeded.
//! - [`OnDemandOrchestrator`]: answers keyed lookups through a TTL cache and
//!   a sliding-window rate limiter, and derives its health from a rolling
//!   buffer of request outcomes.
//!
//! Each mutable structure is guarded by its own mutex and no lock is held
//! across an upstream call.

pub mod on_demand;
pub mod outcomes;
pub mod polling;

pub use on_demand::{Lookup, OnDemandOrchestrator, OnDemandStatus};
pub use outcomes::{OutcomeLog, OutcomeRecord};
pub use polling::{PollCycleRecord, PollStatus, PollingEngine, RefreshOutcome};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Every guarded structure here is updated in single statements, so the
/// value is consistent even after a poisoning panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
