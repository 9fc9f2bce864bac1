//! Rolling buffer of on-demand request outcomes.

use std::collections::VecDeque;

use relay_core::{OnDemandHealth, Outcome, Timestamp};
use serde::{Deserialize, Serialize};

/// One classified request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub at: Timestamp,
    pub outcome: Outcome,
}

/// Fixed-capacity FIFO of recent outcomes.
///
/// Backed by a ring buffer allocated once; pushing onto a full log evicts
/// the oldest record.
#[derive(Debug, Clone)]
pub struct OutcomeLog {
    records: VecDeque<OutcomeRecord>,
    capacity: usize,
}

impl OutcomeLog {
    /// Create an empty log. A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, at: Timestamp, outcome: Outcome) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(OutcomeRecord { at, outcome });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &OutcomeRecord> {
        self.records.iter()
    }

    /// Upstream errors in the buffer.
    pub fn errors(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_error()).count()
    }

    /// Real upstream calls in the buffer.
    pub fn attempts(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_attempt()).count()
    }

    pub fn last_error_at(&self) -> Option<Timestamp> {
        self.records
            .iter()
            .rev()
            .find(|r| r.outcome.is_error())
            .map(|r| r.at)
    }

    /// Classify the buffer.
    ///
    /// `limiter_activated` is only consulted when the buffer holds answers
    /// and no errors.
    pub fn health(&self, limiter_activated: impl FnOnce() -> bool) -> OnDemandHealth {
        if self.records.is_empty() {
            OnDemandHealth::Unused
        } else if !self.records.iter().any(|r| r.outcome.is_answer()) {
            OnDemandHealth::Dead
        } else if self.records.iter().any(|r| r.outcome.is_error()) {
            OnDemandHealth::SomeErrors
        } else if limiter_activated() {
            OnDemandHealth::RateLimited
        } else {
            OnDemandHealth::Healthy
        }
    }
}
