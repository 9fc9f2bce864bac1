//! Sliding-window rate limiter.
//!
//! Counts occurrences inside an exact trailing window ending at "now". The
//! occurrence list is insertion ordered, so purging only ever pops from the
//! front.

use std::collections::VecDeque;
use std::time::Duration;

use relay_core::{to_chrono_duration, SharedClock, Timestamp};

/// Trailing-window occurrence counter.
pub struct SlidingWindowRateLimiter {
    occurrences: VecDeque<Timestamp>,
    max_occurrences: usize,
    window: Duration,
    clock: SharedClock,
}

impl SlidingWindowRateLimiter {
    /// Allow `max_occurrences` within any trailing `window`.
    pub fn new(max_occurrences: usize, window: Duration, clock: SharedClock) -> Self {
        Self {
            occurrences: VecDeque::new(),
            max_occurrences,
            window,
            clock,
        }
    }

    pub fn max_occurrences(&self) -> usize {
        self.max_occurrences
    }

    /// Record an occurrence at the current instant.
    pub fn log_occurrence(&mut self) {
        let now = self.clock.now();
        self.occurrences.push_back(now);
        self.purge(now);
    }

    /// Occurrences within the trailing window.
    pub fn counter_value(&mut self) -> usize {
        let now = self.clock.now();
        self.purge(now);
        self.occurrences.len()
    }

    /// True once the window holds `max_occurrences` or more.
    pub fn activated(&mut self) -> bool {
        self.counter_value() >= self.max_occurrences
    }

    fn purge(&mut self, now: Timestamp) {
        let Some(start) = now.checked_sub_signed(to_chrono_duration(self.window)) else {
            return;
        };
        while self.occurrences.front().is_some_and(|&at| at < start) {
            self.occurrences.pop_front();
        }
    }
}

impl std::fmt::Debug for SlidingWindowRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlidingWindowRateLimiter")
            .field("occurrences", &self.occurrences.len())
            .field("max_occurrences", &self.max_occurrences)
            .field("window", &self.window)
            .finish()
    }
}
